//! Database row types for all tables.
//!
//! Status and type columns stay TEXT at this boundary; domain code converts
//! to/from the enums in `rooms::types` and `ledger`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbWallet {
    pub id: i64,
    pub user_id: i64,
    pub balance: Decimal,
    pub is_frozen: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub tx_type: String,
    pub amount: Decimal,
    pub description: String,
    pub room_id: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbRoom {
    pub id: i64,
    pub creator_id: i64,
    pub goal_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub room_type: String,
    pub status: String,
    pub max_players: i32,
    pub entry_deposit: Decimal,
    pub prize_pool: Decimal,
    pub proof_type: String,
    pub duration: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub agreement_deadline: Option<DateTime<Utc>>,
    pub start_deadline: Option<DateTime<Utc>>,
    pub winner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbParticipant {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub status: String,
    pub progress: f64,
    pub rank: Option<i32>,
    pub has_agreed: bool,
    pub has_started: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbRoadmap {
    pub id: i64,
    pub room_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbMilestone {
    pub id: i64,
    pub roadmap_id: i64,
    pub title: String,
    pub description: String,
    pub week_number: i32,
    pub order_index: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbSubstep {
    pub id: i64,
    pub milestone_id: i64,
    pub title: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbProofSubmission {
    pub id: i64,
    pub milestone_id: i64,
    pub user_id: i64,
    pub proof_type: String,
    pub content: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbUserStats {
    pub user_id: i64,
    pub total_wins: i32,
    pub total_losses: i32,
    pub total_completed: i32,
    pub total_prize_won: Decimal,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbRoomEvent {
    pub id: i64,
    pub room_id: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
