//! Room lifecycle state machine.
//!
//! draft → waiting → waiting_for_agreement → waiting_for_start → active →
//! completed, with cancelled/disputed as side branches. Every transition
//! opens one database transaction and locks the room row `FOR UPDATE` first,
//! so capacity checks, agreement counting, and the completion payout are
//! serialized per room — the API and the deadline sweeper drive the exact
//! same entry points. Money movement folds into the same transaction through
//! the ledger's `*_tx` calls: a failed deposit aborts the whole join.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::config::RoomsConfig;
use crate::db::models::{DbParticipant, DbProofSubmission, DbRoom};
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::events::bus::{EventBus, RoomEvent};
use crate::ledger::{Ledger, TransactionType};
use crate::roadmap::generator;
use crate::rooms::scoring::{self, Standing};
use crate::rooms::types::{
    CompletionTrigger, DurationBucket, ParticipantStatus, ProofStatus, RoomStatus, RoomType,
};

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub room_type: RoomType,
    pub max_players: i32,
    #[serde(default)]
    pub entry_deposit: Decimal,
    #[serde(default = "default_proof_type")]
    pub proof_type: String,
    pub duration: DurationBucket,
    #[serde(default)]
    pub goal_id: Option<i64>,
}

fn default_proof_type() -> String {
    "photo".into()
}

#[derive(Debug, Deserialize)]
pub struct SubmitProofRequest {
    pub milestone_id: i64,
    #[serde(default)]
    pub proof_type: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// A room together with its participant list, as returned to callers.
#[derive(Debug, Serialize)]
pub struct RoomView {
    #[serde(flatten)]
    pub room: DbRoom,
    pub participants: Vec<DbParticipant>,
}

/// Outcome of a proof submission.
#[derive(Debug, Serialize)]
pub struct ProofOutcome {
    pub submission: DbProofSubmission,
    pub progress: f64,
    /// Set when a 1v1 participant hit 100% and the room completed outright.
    pub room_completed: bool,
}

/// Orchestrates room state transitions. All collaborators are injected;
/// nothing here touches globals.
pub struct RoomService {
    db: PgPool,
    bus: Arc<EventBus>,
    cfg: RoomsConfig,
}

impl RoomService {
    pub fn new(db: PgPool, bus: Arc<EventBus>, cfg: RoomsConfig) -> Self {
        Self { db, bus, cfg }
    }

    /// Create a room in `draft`. The creator is not a participant yet — their
    /// own join moves the room to `waiting`.
    pub async fn create(&self, creator_id: i64, req: CreateRoomRequest) -> Result<DbRoom> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if req.max_players < 2 {
            return Err(AppError::Validation("max_players must be at least 2".into()));
        }
        if req.entry_deposit < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "entry_deposit must not be negative".into(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let room = queries::insert_room(
            &mut tx,
            creator_id,
            req.goal_id,
            req.title.trim(),
            req.description.as_deref(),
            req.room_type.as_str(),
            req.max_players,
            req.entry_deposit,
            &req.proof_type,
            req.duration.as_str(),
        )
        .await?;
        queries::record_room_event(
            &mut tx,
            room.id,
            "room_created",
            &json!({ "creator_id": creator_id }),
        )
        .await?;
        tx.commit().await?;

        info!(room_id = room.id, creator_id, "room created");
        self.bus.publish(RoomEvent::RoomCreated {
            room_id: room.id,
            creator_id,
            title: room.title.clone(),
        });
        Ok(room)
    }

    pub async fn get(&self, room_id: i64) -> Result<RoomView> {
        let room = queries::get_room(&self.db, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        let participants = queries::list_participants(&self.db, room_id).await?;
        Ok(RoomView { room, participants })
    }

    /// Join a room: capacity check, deposit debit, participant insert, and
    /// the fill-triggered transition to `waiting_for_agreement`, all in one
    /// atomic unit.
    pub async fn join(&self, room_id: i64, user_id: i64) -> Result<RoomView> {
        let mut tx = self.db.begin().await?;

        let room = queries::lock_room(&mut tx, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        let status = RoomStatus::parse(&room.status)?;
        if !status.accepts_players() {
            return Err(AppError::RoomNotAcceptingPlayers);
        }

        let count = queries::count_participants(&mut tx, room_id).await?;
        if count >= room.max_players as i64 {
            return Err(AppError::RoomFull);
        }
        if queries::get_participant(&mut tx, room_id, user_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyJoined);
        }

        if room.entry_deposit > Decimal::ZERO {
            Ledger::debit_tx(
                &mut tx,
                user_id,
                room.entry_deposit,
                TransactionType::Deposit,
                &format!("Entry deposit for \"{}\"", room.title),
                Some(room_id),
            )
            .await?;
            queries::add_to_prize_pool(&mut tx, room_id, room.entry_deposit).await?;
        }

        queries::insert_participant(&mut tx, room_id, user_id).await?;
        queries::record_room_event(
            &mut tx,
            room_id,
            "player_joined",
            &json!({ "user_id": user_id }),
        )
        .await?;

        let new_count = count + 1;
        let room_filled = new_count >= room.max_players as i64;
        if room_filled {
            let bucket = DurationBucket::parse(&room.duration)?;
            generator::generate_for_room(&mut tx, room_id, bucket).await?;
            let deadline = Utc::now() + Duration::hours(self.cfg.agreement_deadline_hours);
            queries::set_room_agreement_phase(&mut tx, room_id, deadline).await?;
        } else if status == RoomStatus::Draft {
            queries::update_room_status(&mut tx, room_id, RoomStatus::Waiting.as_str()).await?;
        }

        tx.commit().await?;

        info!(room_id, user_id, player_count = new_count, "player joined");
        self.bus.publish(RoomEvent::PlayerJoined {
            room_id,
            user_id,
            player_count: new_count,
            max_players: room.max_players,
        });
        if room_filled {
            self.bus.publish(RoomEvent::AgreementPhase { room_id });
        }
        self.get(room_id).await
    }

    /// Record a participant's agreement; when everyone has agreed the room
    /// moves to `waiting_for_start`. Agreeing twice is a no-op.
    pub async fn agree(&self, room_id: i64, user_id: i64) -> Result<RoomView> {
        let mut tx = self.db.begin().await?;

        let room = queries::lock_room(&mut tx, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        if RoomStatus::parse(&room.status)? != RoomStatus::WaitingForAgreement {
            return Err(AppError::Validation(
                "room is not collecting agreements".into(),
            ));
        }
        let participant = queries::get_participant(&mut tx, room_id, user_id)
            .await?
            .ok_or(AppError::ParticipantNotFound)?;

        let mut all_agreed = false;
        if !participant.has_agreed {
            queries::set_agreed(&mut tx, room_id, user_id).await?;
            let count = queries::count_participants(&mut tx, room_id).await?;
            let agreed = queries::count_agreed(&mut tx, room_id).await?;
            if agreed >= count && count >= room.max_players as i64 {
                let deadline = Utc::now() + Duration::hours(self.cfg.start_deadline_hours);
                queries::set_room_start_phase(&mut tx, room_id, deadline).await?;
                all_agreed = true;
            }
        }

        tx.commit().await?;

        self.bus.publish(RoomEvent::PlayerAgreed { room_id, user_id });
        if all_agreed {
            info!(room_id, "all participants agreed");
            self.bus.publish(RoomEvent::StartPhase { room_id });
        }
        self.get(room_id).await
    }

    /// Record a participant's start; when everyone has started the room
    /// activates and its end date is fixed from the duration bucket.
    pub async fn start(&self, room_id: i64, user_id: i64) -> Result<RoomView> {
        let mut tx = self.db.begin().await?;

        let room = queries::lock_room(&mut tx, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        if RoomStatus::parse(&room.status)? != RoomStatus::WaitingForStart {
            return Err(AppError::Validation(
                "room is not in the start window".into(),
            ));
        }
        let participant = queries::get_participant(&mut tx, room_id, user_id)
            .await?
            .ok_or(AppError::ParticipantNotFound)?;

        let mut activated = false;
        if !participant.has_started {
            queries::set_started(&mut tx, room_id, user_id).await?;
            let count = queries::count_participants(&mut tx, room_id).await?;
            let started = queries::count_started(&mut tx, room_id).await?;
            if started >= count && count >= room.max_players as i64 {
                let bucket = DurationBucket::parse(&room.duration)?;
                let now = Utc::now();
                queries::activate_room(&mut tx, room_id, now, now + Duration::days(bucket.days()))
                    .await?;
                queries::record_room_event(&mut tx, room_id, "room_activated", &json!({})).await?;
                activated = true;
            }
        }

        tx.commit().await?;

        self.bus.publish(RoomEvent::PlayerStarted { room_id, user_id });
        if activated {
            info!(room_id, "room activated");
            self.bus.publish(RoomEvent::RoomActivated { room_id });
        }
        self.get(room_id).await
    }

    /// Submit proof for a milestone and recompute the participant's progress
    /// as approved-milestones / total-milestones. 1v1 rooms complete outright
    /// when a participant reaches 100%.
    pub async fn submit_proof(
        &self,
        room_id: i64,
        user_id: i64,
        req: SubmitProofRequest,
    ) -> Result<ProofOutcome> {
        let mut tx = self.db.begin().await?;

        let room = queries::lock_room(&mut tx, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        if RoomStatus::parse(&room.status)? != RoomStatus::Active {
            return Err(AppError::Validation("room is not active".into()));
        }
        queries::get_participant(&mut tx, room_id, user_id)
            .await?
            .ok_or(AppError::ParticipantNotFound)?;
        if !queries::milestone_in_room(&mut tx, req.milestone_id, room_id).await? {
            return Err(AppError::MilestoneNotFound);
        }

        // MVP review policy: submissions count immediately
        let proof_type = req.proof_type.as_deref().unwrap_or(&room.proof_type);
        let submission = queries::insert_proof(
            &mut tx,
            req.milestone_id,
            user_id,
            proof_type,
            &req.content,
            ProofStatus::Approved.as_str(),
        )
        .await?;

        let total = queries::count_milestones(&mut tx, room_id).await?;
        let approved = queries::count_approved_milestones(&mut tx, room_id, user_id).await?;
        let computed = if total > 0 {
            (approved as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let progress = queries::update_progress(&mut tx, room_id, user_id, computed).await?;
        queries::record_room_event(
            &mut tx,
            room_id,
            "proof_submitted",
            &json!({ "user_id": user_id, "milestone_id": req.milestone_id, "progress": progress }),
        )
        .await?;

        tx.commit().await?;

        self.bus.publish(RoomEvent::ProgressUpdated {
            room_id,
            user_id,
            progress,
        });

        let room_type = RoomType::parse(&room.room_type)?;
        let mut room_completed = false;
        if room_type.completion_trigger() == CompletionTrigger::OnFullProgress
            && progress >= 100.0
        {
            info!(room_id, user_id, "head-to-head participant finished, completing room");
            self.complete(room_id).await?;
            room_completed = true;
        }

        Ok(ProofOutcome {
            submission,
            progress,
            room_completed,
        })
    }

    /// Complete a room: rank participants, pay the prize once, finalize
    /// stats and ranks. Idempotent — completing a completed room returns it
    /// unchanged, so the sweeper and an explicit client call can race safely.
    pub async fn complete(&self, room_id: i64) -> Result<RoomView> {
        let mut tx = self.db.begin().await?;

        let room = queries::lock_room(&mut tx, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        let status = RoomStatus::parse(&room.status)?;
        if status == RoomStatus::Completed {
            // Already done; nothing to pay, nothing to rank
            tx.commit().await?;
            return self.get(room_id).await;
        }
        if !status.completable() {
            return Err(AppError::RoomNotCompletable);
        }

        let participants = queries::list_participants_tx(&mut tx, room_id).await?;
        if participants.is_empty() {
            return Err(AppError::RoomNotCompletable);
        }
        let ranked = scoring::rank(participants.iter().map(Standing::from).collect());
        let winner = &ranked[0];

        if room.prize_pool > Decimal::ZERO {
            Ledger::credit_tx(
                &mut tx,
                winner.user_id,
                room.prize_pool,
                TransactionType::Prize,
                &format!("Prize for winning \"{}\"", room.title),
                Some(room_id),
            )
            .await?;
        }

        for (position, standing) in ranked.iter().enumerate() {
            queries::finalize_participant(
                &mut tx,
                room_id,
                standing.user_id,
                position as i32,
                ParticipantStatus::Completed.as_str(),
            )
            .await?;
            if position == 0 {
                queries::apply_winner_stats(&mut tx, standing.user_id, room.prize_pool).await?;
            } else {
                queries::apply_loser_stats(&mut tx, standing.user_id).await?;
            }
        }

        queries::complete_room(&mut tx, room_id, winner.user_id).await?;
        queries::record_room_event(
            &mut tx,
            room_id,
            "room_completed",
            &json!({ "winner_id": winner.user_id, "prize_pool": room.prize_pool }),
        )
        .await?;

        tx.commit().await?;

        info!(
            room_id,
            winner_id = winner.user_id,
            prize_pool = %room.prize_pool,
            "room completed"
        );
        self.bus.publish(RoomEvent::RoomCompleted {
            room_id,
            winner_id: winner.user_id,
            prize_pool: room.prize_pool,
        });
        self.get(room_id).await
    }

    /// Cancel a room (admin path, also used by the sweeper for expired
    /// waiting phases): refund each participant's entry deposit, zero the
    /// prize pool, and close the room.
    pub async fn cancel(&self, room_id: i64) -> Result<RoomView> {
        let mut tx = self.db.begin().await?;

        let room = queries::lock_room(&mut tx, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        if !RoomStatus::parse(&room.status)?.cancellable() {
            return Err(AppError::RoomNotCancellable);
        }

        if room.entry_deposit > Decimal::ZERO {
            let participants = queries::list_participants_tx(&mut tx, room_id).await?;
            for participant in &participants {
                Ledger::credit_tx(
                    &mut tx,
                    participant.user_id,
                    room.entry_deposit,
                    TransactionType::Refund,
                    &format!("Refund for cancelled room \"{}\"", room.title),
                    Some(room_id),
                )
                .await?;
            }
        }

        queries::cancel_room(&mut tx, room_id).await?;
        queries::record_room_event(&mut tx, room_id, "room_cancelled", &json!({})).await?;

        tx.commit().await?;

        info!(room_id, "room cancelled");
        self.bus.publish(RoomEvent::RoomCancelled { room_id });
        self.get(room_id).await
    }

    /// Tip a room's prize pool from an outside wallet.
    pub async fn tip(&self, room_id: i64, from_user_id: i64, amount: Decimal) -> Result<RoomView> {
        let mut tx = self.db.begin().await?;

        let room = queries::lock_room(&mut tx, room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        if RoomStatus::parse(&room.status)?.is_terminal() {
            return Err(AppError::Validation(
                "room is closed and cannot receive tips".into(),
            ));
        }

        Ledger::debit_tx(
            &mut tx,
            from_user_id,
            amount,
            TransactionType::Tip,
            &format!("Tip to prize pool of \"{}\"", room.title),
            Some(room_id),
        )
        .await?;
        queries::add_to_prize_pool(&mut tx, room_id, amount).await?;
        queries::record_room_event(
            &mut tx,
            room_id,
            "tip_received",
            &json!({ "from_user_id": from_user_id, "amount": amount }),
        )
        .await?;

        tx.commit().await?;

        self.bus.publish(RoomEvent::TipReceived {
            room_id,
            from_user_id,
            amount,
        });
        self.get(room_id).await
    }
}
