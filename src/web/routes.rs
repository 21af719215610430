//! HTTP route handlers.
//!
//! The authenticated user id arrives in the `X-User-Id` header — session
//! issuance lives in the auth service in front of this one, and the handlers
//! trust the id it forwards.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{pool, queries};
use crate::error::{AppError, Result};
use crate::ledger::TransactionType;
use crate::rooms::machine::{CreateRoomRequest, SubmitProofRequest};

use super::server::AppState;
use super::ws;

/// Build all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/:id", get(get_room))
        .route("/api/rooms/:id/roadmap", get(get_roadmap))
        .route("/api/rooms/:id/events", get(get_room_events))
        .route("/api/rooms/:id/join", post(join_room))
        .route("/api/rooms/:id/agree", post(agree))
        .route("/api/rooms/:id/start", post(start))
        .route("/api/rooms/:id/complete", post(complete))
        .route("/api/rooms/:id/cancel", post(cancel))
        .route("/api/rooms/:id/tip", post(tip))
        .route("/api/rooms/:id/proofs", post(submit_proof))
        .route("/api/users/:id/stats", get(get_user_stats))
        .route("/api/wallet", get(get_wallet))
        .route("/api/wallet/transactions", get(get_transactions))
        .route("/api/wallet/topup", post(top_up))
        .route("/api/wallet/withdraw", post(withdraw))
        .route("/api/transactions/:id/reverse", post(reverse_transaction))
        .route("/api/status", get(status))
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
}

/// Pull the trusted user id out of the auth boundary header.
fn user_id(headers: &HeaderMap) -> Result<i64> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or(AppError::Unauthorized)
}

#[derive(Debug, Deserialize)]
struct AmountRequest {
    amount: Decimal,
    #[serde(default)]
    description: Option<String>,
}

// ── Rooms ────────────────────────────────────────────────────────

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<Value>> {
    let creator = user_id(&headers)?;
    let room = state.rooms.create(creator, req).await?;
    Ok(Json(json!({ "room": room })))
}

async fn get_room(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    let view = state.rooms.get(id).await?;
    Ok(Json(json!({ "room": view })))
}

async fn get_roadmap(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    let milestones = queries::list_milestones(&state.db, id).await?;
    let mut out = Vec::with_capacity(milestones.len());
    for milestone in milestones {
        let substeps = queries::list_substeps(&state.db, milestone.id).await?;
        out.push(json!({ "milestone": milestone, "substeps": substeps }));
    }
    Ok(Json(json!({ "roadmap": out })))
}

async fn get_room_events(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let events = queries::list_room_events(&state.db, id, 100).await?;
    Ok(Json(json!({ "events": events })))
}

async fn join_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let view = state.rooms.join(id, user).await?;
    Ok(Json(json!({ "room": view })))
}

async fn agree(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let view = state.rooms.agree(id, user).await?;
    Ok(Json(json!({ "room": view })))
}

async fn start(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let view = state.rooms.start(id, user).await?;
    Ok(Json(json!({ "room": view })))
}

async fn complete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    let view = state.rooms.complete(id).await?;
    Ok(Json(json!({ "room": view })))
}

async fn cancel(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    let view = state.rooms.cancel(id).await?;
    Ok(Json(json!({ "room": view })))
}

async fn tip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let view = state.rooms.tip(id, user, req.amount).await?;
    Ok(Json(json!({ "room": view })))
}

async fn submit_proof(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<SubmitProofRequest>,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let outcome = state.rooms.submit_proof(id, user, req).await?;
    Ok(Json(json!({ "proof": outcome })))
}

/// GET /api/users/:id/stats — win/loss record and total prize money.
async fn get_user_stats(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    let stats = queries::get_user_stats(&state.db, id).await?;
    Ok(Json(json!({ "stats": stats })))
}

// ── Wallet ───────────────────────────────────────────────────────

async fn get_wallet(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let wallet = queries::get_wallet(&state.db, user)
        .await?
        .ok_or(AppError::WalletNotFound)?;
    Ok(Json(json!({ "wallet": wallet })))
}

async fn get_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let wallet = queries::get_wallet(&state.db, user)
        .await?
        .ok_or(AppError::WalletNotFound)?;
    let transactions = queries::list_transactions(&state.db, wallet.id, 100).await?;
    Ok(Json(json!({ "transactions": transactions })))
}

async fn top_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let description = req.description.as_deref().unwrap_or("Wallet top-up");
    let record = state
        .ledger
        .credit(user, req.amount, TransactionType::TopUp, description, None)
        .await?;
    Ok(Json(json!({ "transaction": record })))
}

async fn withdraw(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Value>> {
    let user = user_id(&headers)?;
    let description = req.description.as_deref().unwrap_or("Wallet withdrawal");
    let record = state
        .ledger
        .debit(user, req.amount, TransactionType::Withdrawal, description, None)
        .await?;
    Ok(Json(json!({ "transaction": record })))
}

async fn reverse_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let record = state.ledger.reverse(id).await?;
    Ok(Json(json!({ "transaction": record })))
}

// ── Service ──────────────────────────────────────────────────────

/// GET /api/status — overall service status.
async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "event_subscribers": state.bus.subscriber_count(),
        "ws_connections": state.ws_registry.total(),
    }))
}

/// GET /health — simple health check including the database.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let db_ok = pool::health_check(&state.db).await.is_ok();
    Json(json!({ "ok": db_ok }))
}
