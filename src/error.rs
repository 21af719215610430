//! Unified error types for the service.
//!
//! Every guard failure in the room state machine and the ledger surfaces as a
//! distinct variant so callers can branch on kind instead of parsing message
//! text. `status_code`/`kind` drive the HTTP mapping in the web layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Not-found
    #[error("room not found")]
    RoomNotFound,
    #[error("participant not found in this room")]
    ParticipantNotFound,
    #[error("wallet not found")]
    WalletNotFound,
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("milestone not found in this room's roadmap")]
    MilestoneNotFound,

    // Preconditions
    #[error("room is not accepting players")]
    RoomNotAcceptingPlayers,
    #[error("room is full")]
    RoomFull,
    #[error("user has already joined this room")]
    AlreadyJoined,
    #[error("room cannot be completed in its current state")]
    RoomNotCompletable,
    #[error("room cannot be cancelled in its current state")]
    RoomNotCancellable,
    #[error("transaction was already reversed")]
    AlreadyReversed,

    // Resources
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("wallet is frozen")]
    WalletFrozen,

    // Validation
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("missing or invalid X-User-Id header")]
    Unauthorized,

    // Infrastructure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Stable machine-readable kind for API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::RoomNotFound => "room_not_found",
            AppError::ParticipantNotFound => "participant_not_found",
            AppError::WalletNotFound => "wallet_not_found",
            AppError::TransactionNotFound => "transaction_not_found",
            AppError::MilestoneNotFound => "milestone_not_found",
            AppError::RoomNotAcceptingPlayers => "room_not_accepting_players",
            AppError::RoomFull => "room_full",
            AppError::AlreadyJoined => "already_joined",
            AppError::RoomNotCompletable => "room_not_completable",
            AppError::RoomNotCancellable => "room_not_cancellable",
            AppError::AlreadyReversed => "already_reversed",
            AppError::InsufficientFunds => "insufficient_funds",
            AppError::WalletFrozen => "wallet_frozen",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized => "unauthorized",
            AppError::Database(_) => "database_error",
            AppError::Json(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::RoomNotFound
            | AppError::ParticipantNotFound
            | AppError::WalletNotFound
            | AppError::TransactionNotFound
            | AppError::MilestoneNotFound => StatusCode::NOT_FOUND,
            AppError::RoomNotAcceptingPlayers
            | AppError::RoomFull
            | AppError::AlreadyJoined
            | AppError::RoomNotCompletable
            | AppError::RoomNotCancellable
            | AppError::AlreadyReversed => StatusCode::CONFLICT,
            AppError::InsufficientFunds | AppError::WalletFrozen => StatusCode::PAYMENT_REQUIRED,
            AppError::InvalidAmount(_) | AppError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_map_to_conflict() {
        assert_eq!(AppError::RoomFull.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::AlreadyJoined.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::RoomNotCompletable.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn resource_errors_map_to_payment_required() {
        assert_eq!(
            AppError::InsufficientFunds.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::WalletFrozen.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn kinds_are_distinct_for_ui_branching() {
        assert_ne!(AppError::RoomFull.kind(), AppError::InsufficientFunds.kind());
        assert_ne!(AppError::RoomNotFound.kind(), AppError::WalletNotFound.kind());
    }
}
