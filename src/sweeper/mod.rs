//! Deadline sweeper — periodic completion of expired rooms.
//!
//! Drives the same `RoomService` entry points as the API, so both paths
//! converge on identical invariants. A failure on one room is logged and
//! never aborts the rest of the sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::time;
use tracing::{error, info, warn};

use crate::db::queries;
use crate::error::Result;
use crate::rooms::machine::RoomService;

/// Counters for one sweep pass.
#[derive(Debug, Default)]
pub struct SweepStats {
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
}

/// Run the sweep on a fixed interval until the process shuts down.
pub async fn run_sweeper_loop(db: PgPool, service: Arc<RoomService>, interval_secs: u64) {
    let mut ticker = time::interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    info!(interval_secs, "deadline sweeper started");

    loop {
        ticker.tick().await;
        match sweep_once(&db, &service).await {
            Ok(stats) => {
                if stats.completed + stats.cancelled + stats.failed > 0 {
                    info!(
                        completed = stats.completed,
                        cancelled = stats.cancelled,
                        failed = stats.failed,
                        "sweep finished"
                    );
                }
            }
            // Only the room listing itself can fail here; per-room errors are
            // absorbed inside sweep_once
            Err(e) => error!(error = %e, "sweep aborted"),
        }
    }
}

/// One sweep pass: complete expired active rooms, then cancel rooms stuck
/// past their agreement/start deadlines (refunding deposits).
pub async fn sweep_once(db: &PgPool, service: &RoomService) -> Result<SweepStats> {
    let now = Utc::now();
    let mut stats = SweepStats::default();

    for room_id in queries::expired_active_rooms(db, now).await? {
        match service.complete(room_id).await {
            Ok(view) => {
                info!(room_id, winner_id = ?view.room.winner_id, "expired room completed");
                stats.completed += 1;
            }
            Err(e) => {
                warn!(room_id, error = %e, "failed to complete expired room, continuing");
                stats.failed += 1;
            }
        }
    }

    for room_id in queries::stale_waiting_rooms(db, now).await? {
        match service.cancel(room_id).await {
            Ok(_) => {
                info!(room_id, "stale waiting room cancelled");
                stats.cancelled += 1;
            }
            Err(e) => {
                warn!(room_id, error = %e, "failed to cancel stale room, continuing");
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
