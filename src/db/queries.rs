//! SQL query functions for all tables.
//!
//! Functions that must participate in a caller's atomic unit take a
//! `&mut Transaction` — room transitions and ledger movements compose several
//! of these under one transaction with the owning row locked `FOR UPDATE`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::*;
use crate::error::Result;

// ── Wallets ──────────────────────────────────────────────────────

/// Create the user's wallet if it does not exist yet.
pub async fn ensure_wallet(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Lock the wallet row for the duration of the transaction. Serializes
/// concurrent debits/credits against the same wallet.
pub async fn lock_wallet(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
) -> Result<Option<DbWallet>> {
    let row = sqlx::query_as::<_, DbWallet>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

pub async fn update_wallet_balance(
    tx: &mut Transaction<'_, Postgres>,
    wallet_id: i64,
    balance: Decimal,
) -> Result<()> {
    sqlx::query("UPDATE wallets SET balance = $1 WHERE id = $2")
        .bind(balance)
        .bind(wallet_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn get_wallet(pool: &PgPool, user_id: i64) -> Result<Option<DbWallet>> {
    let row = sqlx::query_as::<_, DbWallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

// ── Transactions ─────────────────────────────────────────────────

pub async fn insert_transaction(
    tx: &mut Transaction<'_, Postgres>,
    wallet_id: i64,
    tx_type: &str,
    amount: Decimal,
    description: &str,
    room_id: Option<i64>,
    status: &str,
) -> Result<DbTransaction> {
    let row = sqlx::query_as::<_, DbTransaction>(
        "INSERT INTO transactions (wallet_id, tx_type, amount, description, room_id, status)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(wallet_id)
    .bind(tx_type)
    .bind(amount)
    .bind(description)
    .bind(room_id)
    .bind(status)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn lock_transaction(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: i64,
) -> Result<Option<DbTransaction>> {
    let row =
        sqlx::query_as::<_, DbTransaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(transaction_id)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row)
}

pub async fn mark_transaction_reversed(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: i64,
) -> Result<()> {
    sqlx::query("UPDATE transactions SET status = 'reversed' WHERE id = $1")
        .bind(transaction_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn list_transactions(
    pool: &PgPool,
    wallet_id: i64,
    limit: i64,
) -> Result<Vec<DbTransaction>> {
    let rows = sqlx::query_as::<_, DbTransaction>(
        "SELECT * FROM transactions WHERE wallet_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(wallet_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Rooms ────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub async fn insert_room(
    tx: &mut Transaction<'_, Postgres>,
    creator_id: i64,
    goal_id: Option<i64>,
    title: &str,
    description: Option<&str>,
    room_type: &str,
    max_players: i32,
    entry_deposit: Decimal,
    proof_type: &str,
    duration: &str,
) -> Result<DbRoom> {
    let row = sqlx::query_as::<_, DbRoom>(
        "INSERT INTO rooms (creator_id, goal_id, title, description, room_type,
         max_players, entry_deposit, proof_type, duration)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(creator_id)
    .bind(goal_id)
    .bind(title)
    .bind(description)
    .bind(room_type)
    .bind(max_players)
    .bind(entry_deposit)
    .bind(proof_type)
    .bind(duration)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Lock the room row for the duration of the transaction. Every state
/// transition starts here, so capacity checks, agreement counting, and
/// completion are serialized per room.
pub async fn lock_room(tx: &mut Transaction<'_, Postgres>, room_id: i64) -> Result<Option<DbRoom>> {
    let row = sqlx::query_as::<_, DbRoom>("SELECT * FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(room_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

pub async fn get_room(pool: &PgPool, room_id: i64) -> Result<Option<DbRoom>> {
    let row = sqlx::query_as::<_, DbRoom>("SELECT * FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_room_status(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    status: &str,
) -> Result<()> {
    sqlx::query("UPDATE rooms SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn set_room_agreement_phase(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    deadline: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE rooms SET status = 'waiting_for_agreement', agreement_deadline = $1 WHERE id = $2",
    )
    .bind(deadline)
    .bind(room_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn set_room_start_phase(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    deadline: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE rooms SET status = 'waiting_for_start', start_deadline = $1 WHERE id = $2")
        .bind(deadline)
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn activate_room(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE rooms SET status = 'active', start_date = $1, end_date = $2 WHERE id = $3")
        .bind(start_date)
        .bind(end_date)
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn complete_room(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    winner_id: i64,
) -> Result<()> {
    sqlx::query("UPDATE rooms SET status = 'completed', winner_id = $1 WHERE id = $2")
        .bind(winner_id)
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn cancel_room(tx: &mut Transaction<'_, Postgres>, room_id: i64) -> Result<()> {
    sqlx::query("UPDATE rooms SET status = 'cancelled', prize_pool = 0 WHERE id = $1")
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn add_to_prize_pool(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    amount: Decimal,
) -> Result<()> {
    sqlx::query("UPDATE rooms SET prize_pool = prize_pool + $1 WHERE id = $2")
        .bind(amount)
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Active rooms whose end date has passed — the sweeper's completion targets.
pub async fn expired_active_rooms(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<i64>> {
    let rows = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM rooms WHERE status = 'active' AND end_date <= $1 ORDER BY end_date",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Rooms stuck in a waiting phase past its deadline — the sweeper's
/// auto-cancel targets.
pub async fn stale_waiting_rooms(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<i64>> {
    let rows = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM rooms
         WHERE (status = 'waiting_for_agreement' AND agreement_deadline <= $1)
            OR (status = 'waiting_for_start' AND start_deadline <= $1)
         ORDER BY id",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Participants ─────────────────────────────────────────────────

pub async fn insert_participant(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    user_id: i64,
) -> Result<DbParticipant> {
    let row = sqlx::query_as::<_, DbParticipant>(
        "INSERT INTO participants (room_id, user_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn get_participant(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    user_id: i64,
) -> Result<Option<DbParticipant>> {
    let row = sqlx::query_as::<_, DbParticipant>(
        "SELECT * FROM participants WHERE room_id = $1 AND user_id = $2",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn count_participants(tx: &mut Transaction<'_, Postgres>, room_id: i64) -> Result<i64> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM participants WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(count)
}

pub async fn list_participants_tx(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
) -> Result<Vec<DbParticipant>> {
    let rows = sqlx::query_as::<_, DbParticipant>(
        "SELECT * FROM participants WHERE room_id = $1 ORDER BY joined_at, id",
    )
    .bind(room_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

pub async fn list_participants(pool: &PgPool, room_id: i64) -> Result<Vec<DbParticipant>> {
    let rows = sqlx::query_as::<_, DbParticipant>(
        "SELECT * FROM participants WHERE room_id = $1 ORDER BY joined_at, id",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn set_agreed(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    user_id: i64,
) -> Result<()> {
    sqlx::query("UPDATE participants SET has_agreed = TRUE WHERE room_id = $1 AND user_id = $2")
        .bind(room_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn count_agreed(tx: &mut Transaction<'_, Postgres>, room_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM participants WHERE room_id = $1 AND has_agreed",
    )
    .bind(room_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

pub async fn set_started(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    user_id: i64,
) -> Result<()> {
    sqlx::query("UPDATE participants SET has_started = TRUE WHERE room_id = $1 AND user_id = $2")
        .bind(room_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn count_started(tx: &mut Transaction<'_, Postgres>, room_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM participants WHERE room_id = $1 AND has_started",
    )
    .bind(room_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

/// GREATEST keeps progress monotonically non-decreasing even if submissions
/// land out of order.
pub async fn update_progress(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    user_id: i64,
    progress: f64,
) -> Result<f64> {
    let row = sqlx::query_scalar::<_, f64>(
        "UPDATE participants SET progress = GREATEST(progress, $1)
         WHERE room_id = $2 AND user_id = $3
         RETURNING progress",
    )
    .bind(progress)
    .bind(room_id)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn finalize_participant(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    user_id: i64,
    rank: i32,
    status: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE participants SET status = $1, rank = $2
         WHERE room_id = $3 AND user_id = $4",
    )
    .bind(status)
    .bind(rank)
    .bind(room_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ── Roadmaps ─────────────────────────────────────────────────────

pub async fn get_roadmap_tx(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
) -> Result<Option<DbRoadmap>> {
    let row = sqlx::query_as::<_, DbRoadmap>("SELECT * FROM roadmaps WHERE room_id = $1")
        .bind(room_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

/// Insert a roadmap row; returns None if one already exists (the unique
/// constraint resolves the concurrent-generation race in favor of one caller).
pub async fn insert_roadmap(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
) -> Result<Option<i64>> {
    let row = sqlx::query_scalar::<_, i64>(
        "INSERT INTO roadmaps (room_id) VALUES ($1) ON CONFLICT (room_id) DO NOTHING RETURNING id",
    )
    .bind(room_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn insert_milestone(
    tx: &mut Transaction<'_, Postgres>,
    roadmap_id: i64,
    title: &str,
    description: &str,
    week_number: i32,
    order_index: i32,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO milestones (roadmap_id, title, description, week_number, order_index)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(roadmap_id)
    .bind(title)
    .bind(description)
    .bind(week_number)
    .bind(order_index)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

pub async fn insert_substep(
    tx: &mut Transaction<'_, Postgres>,
    milestone_id: i64,
    title: &str,
    order_index: i32,
) -> Result<()> {
    sqlx::query("INSERT INTO substeps (milestone_id, title, order_index) VALUES ($1, $2, $3)")
        .bind(milestone_id)
        .bind(title)
        .bind(order_index)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn count_milestones(tx: &mut Transaction<'_, Postgres>, room_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM milestones m
         JOIN roadmaps r ON r.id = m.roadmap_id
         WHERE r.room_id = $1",
    )
    .bind(room_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

pub async fn milestone_in_room(
    tx: &mut Transaction<'_, Postgres>,
    milestone_id: i64,
    room_id: i64,
) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT m.id FROM milestones m
         JOIN roadmaps r ON r.id = m.roadmap_id
         WHERE m.id = $1 AND r.room_id = $2",
    )
    .bind(milestone_id)
    .bind(room_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(found.is_some())
}

pub async fn list_milestones(pool: &PgPool, room_id: i64) -> Result<Vec<DbMilestone>> {
    let rows = sqlx::query_as::<_, DbMilestone>(
        "SELECT m.* FROM milestones m
         JOIN roadmaps r ON r.id = m.roadmap_id
         WHERE r.room_id = $1
         ORDER BY m.order_index",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_substeps(pool: &PgPool, milestone_id: i64) -> Result<Vec<DbSubstep>> {
    let rows = sqlx::query_as::<_, DbSubstep>(
        "SELECT * FROM substeps WHERE milestone_id = $1 ORDER BY order_index",
    )
    .bind(milestone_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Proof submissions ────────────────────────────────────────────

pub async fn insert_proof(
    tx: &mut Transaction<'_, Postgres>,
    milestone_id: i64,
    user_id: i64,
    proof_type: &str,
    content: &str,
    status: &str,
) -> Result<DbProofSubmission> {
    let row = sqlx::query_as::<_, DbProofSubmission>(
        "INSERT INTO proof_submissions (milestone_id, user_id, proof_type, content, status)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(milestone_id)
    .bind(user_id)
    .bind(proof_type)
    .bind(content)
    .bind(status)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Distinct milestones this user has an approved submission for, within the
/// room's roadmap. The numerator of the progress ratio.
pub async fn count_approved_milestones(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    user_id: i64,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT p.milestone_id) FROM proof_submissions p
         JOIN milestones m ON m.id = p.milestone_id
         JOIN roadmaps r ON r.id = m.roadmap_id
         WHERE r.room_id = $1 AND p.user_id = $2 AND p.status = 'approved'",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

// ── User stats ───────────────────────────────────────────────────

pub async fn apply_winner_stats(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    prize: Decimal,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_stats (user_id, total_wins, total_completed, total_prize_won)
         VALUES ($1, 1, 1, $2)
         ON CONFLICT (user_id) DO UPDATE SET
           total_wins = user_stats.total_wins + 1,
           total_completed = user_stats.total_completed + 1,
           total_prize_won = user_stats.total_prize_won + EXCLUDED.total_prize_won",
    )
    .bind(user_id)
    .bind(prize)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn apply_loser_stats(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_stats (user_id, total_losses, total_completed)
         VALUES ($1, 1, 1)
         ON CONFLICT (user_id) DO UPDATE SET
           total_losses = user_stats.total_losses + 1,
           total_completed = user_stats.total_completed + 1",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn get_user_stats(pool: &PgPool, user_id: i64) -> Result<Option<DbUserStats>> {
    let row = sqlx::query_as::<_, DbUserStats>("SELECT * FROM user_stats WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

// ── Room feed events ─────────────────────────────────────────────

pub async fn record_room_event(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<()> {
    sqlx::query("INSERT INTO room_events (room_id, event_type, payload) VALUES ($1, $2, $3)")
        .bind(room_id)
        .bind(event_type)
        .bind(payload)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn list_room_events(
    pool: &PgPool,
    room_id: i64,
    limit: i64,
) -> Result<Vec<DbRoomEvent>> {
    let rows = sqlx::query_as::<_, DbRoomEvent>(
        "SELECT * FROM room_events WHERE room_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(room_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
