//! Domain enums for the room lifecycle.
//!
//! TEXT columns at the db boundary, exhaustively-matched enums everywhere
//! else. `RoomType::completion_trigger` replaces the ad-hoc string branching
//! on room format with a policy the compiler checks.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Room lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Draft,
    Waiting,
    WaitingForAgreement,
    WaitingForStart,
    Active,
    Completed,
    Cancelled,
    Disputed,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Draft => "draft",
            RoomStatus::Waiting => "waiting",
            RoomStatus::WaitingForAgreement => "waiting_for_agreement",
            RoomStatus::WaitingForStart => "waiting_for_start",
            RoomStatus::Active => "active",
            RoomStatus::Completed => "completed",
            RoomStatus::Cancelled => "cancelled",
            RoomStatus::Disputed => "disputed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(RoomStatus::Draft),
            "waiting" => Ok(RoomStatus::Waiting),
            "waiting_for_agreement" => Ok(RoomStatus::WaitingForAgreement),
            "waiting_for_start" => Ok(RoomStatus::WaitingForStart),
            "active" => Ok(RoomStatus::Active),
            "completed" => Ok(RoomStatus::Completed),
            "cancelled" => Ok(RoomStatus::Cancelled),
            "disputed" => Ok(RoomStatus::Disputed),
            other => Err(AppError::Validation(format!("unknown room status: {other}"))),
        }
    }

    /// Joins are only possible before the room fills.
    pub fn accepts_players(&self) -> bool {
        matches!(self, RoomStatus::Draft | RoomStatus::Waiting)
    }

    /// Completion runs from `active`, or from `disputed` after moderation.
    pub fn completable(&self) -> bool {
        matches!(self, RoomStatus::Active | RoomStatus::Disputed)
    }

    /// Admin cancellation covers the waiting phases and active play.
    pub fn cancellable(&self) -> bool {
        matches!(
            self,
            RoomStatus::Draft
                | RoomStatus::Waiting
                | RoomStatus::WaitingForAgreement
                | RoomStatus::WaitingForStart
                | RoomStatus::Active
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RoomStatus::Completed | RoomStatus::Cancelled)
    }
}

/// Competition format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[serde(rename = "1v1")]
    OneVsOne,
    Group,
    FreeForAll,
}

/// When a room pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTrigger {
    /// First participant to hit 100% progress ends the room outright.
    OnFullProgress,
    /// The room runs until its deadline or an explicit completion call.
    DeadlineOnly,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::OneVsOne => "1v1",
            RoomType::Group => "group",
            RoomType::FreeForAll => "free_for_all",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "1v1" => Ok(RoomType::OneVsOne),
            "group" => Ok(RoomType::Group),
            "free_for_all" => Ok(RoomType::FreeForAll),
            other => Err(AppError::Validation(format!("unknown room type: {other}"))),
        }
    }

    pub fn completion_trigger(&self) -> CompletionTrigger {
        match self {
            RoomType::OneVsOne => CompletionTrigger::OnFullProgress,
            RoomType::Group | RoomType::FreeForAll => CompletionTrigger::DeadlineOnly,
        }
    }
}

/// Room duration buckets — the weeks table that seeds roadmap generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBucket {
    OneWeek,
    TwoWeeks,
    OneMonth,
    ThreeMonths,
}

impl DurationBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationBucket::OneWeek => "one_week",
            DurationBucket::TwoWeeks => "two_weeks",
            DurationBucket::OneMonth => "one_month",
            DurationBucket::ThreeMonths => "three_months",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "one_week" => Ok(DurationBucket::OneWeek),
            "two_weeks" => Ok(DurationBucket::TwoWeeks),
            "one_month" => Ok(DurationBucket::OneMonth),
            "three_months" => Ok(DurationBucket::ThreeMonths),
            other => Err(AppError::Validation(format!(
                "unknown duration bucket: {other}"
            ))),
        }
    }

    /// Roadmap iterations for this bucket.
    pub fn weeks(&self) -> i32 {
        match self {
            DurationBucket::OneWeek => 1,
            DurationBucket::TwoWeeks => 2,
            DurationBucket::OneMonth => 4,
            DurationBucket::ThreeMonths => 12,
        }
    }

    /// Calendar days between activation and the room's end date.
    pub fn days(&self) -> i64 {
        match self {
            DurationBucket::OneWeek => 7,
            DurationBucket::TwoWeeks => 14,
            DurationBucket::OneMonth => 30,
            DurationBucket::ThreeMonths => 90,
        }
    }
}

/// Participant membership states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantStatus {
    Active,
    Completed,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Active => "active",
            ParticipantStatus::Completed => "completed",
        }
    }
}

/// Proof submission review states. The MVP path auto-approves on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStatus {
    Pending,
    Approved,
    Declined,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::Pending => "pending",
            ProofStatus::Approved => "approved",
            ProofStatus::Declined => "declined",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            RoomStatus::Draft,
            RoomStatus::Waiting,
            RoomStatus::WaitingForAgreement,
            RoomStatus::WaitingForStart,
            RoomStatus::Active,
            RoomStatus::Completed,
            RoomStatus::Cancelled,
            RoomStatus::Disputed,
        ] {
            assert_eq!(RoomStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn only_pre_fill_states_accept_players() {
        assert!(RoomStatus::Draft.accepts_players());
        assert!(RoomStatus::Waiting.accepts_players());
        assert!(!RoomStatus::WaitingForAgreement.accepts_players());
        assert!(!RoomStatus::Active.accepts_players());
        assert!(!RoomStatus::Completed.accepts_players());
    }

    #[test]
    fn completion_runs_from_active_or_disputed_only() {
        assert!(RoomStatus::Active.completable());
        assert!(RoomStatus::Disputed.completable());
        assert!(!RoomStatus::Waiting.completable());
        assert!(!RoomStatus::Completed.completable());
    }

    #[test]
    fn head_to_head_completes_on_full_progress() {
        assert_eq!(
            RoomType::OneVsOne.completion_trigger(),
            CompletionTrigger::OnFullProgress
        );
        assert_eq!(
            RoomType::Group.completion_trigger(),
            CompletionTrigger::DeadlineOnly
        );
        assert_eq!(
            RoomType::FreeForAll.completion_trigger(),
            CompletionTrigger::DeadlineOnly
        );
    }

    #[test]
    fn duration_table_maps_weeks_and_days() {
        assert_eq!(DurationBucket::OneWeek.weeks(), 1);
        assert_eq!(DurationBucket::TwoWeeks.weeks(), 2);
        assert_eq!(DurationBucket::OneMonth.weeks(), 4);
        assert_eq!(DurationBucket::ThreeMonths.weeks(), 12);
        assert_eq!(DurationBucket::OneWeek.days(), 7);
        assert_eq!(DurationBucket::ThreeMonths.days(), 90);
    }

    #[test]
    fn room_type_uses_wire_names() {
        assert_eq!(RoomType::OneVsOne.as_str(), "1v1");
        assert_eq!(RoomType::parse("free_for_all").unwrap(), RoomType::FreeForAll);
        assert!(RoomType::parse("2v2").is_err());
    }
}
