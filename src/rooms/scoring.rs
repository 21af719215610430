//! Completion scoring — ranking participants and picking the winner.
//!
//! Ties on progress break by earliest join: a deliberate, documented rule
//! rather than whatever order rows happen to come back in.

use chrono::{DateTime, Utc};

use crate::db::models::DbParticipant;

/// A participant's standing at completion time.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub user_id: i64,
    pub progress: f64,
    pub joined_at: DateTime<Utc>,
}

impl From<&DbParticipant> for Standing {
    fn from(p: &DbParticipant) -> Self {
        Self {
            user_id: p.user_id,
            progress: p.progress,
            joined_at: p.joined_at,
        }
    }
}

/// Order standings: progress descending, then earliest joined first.
/// Index 0 is the winner; a participant's rank is its index.
pub fn rank(mut standings: Vec<Standing>) -> Vec<Standing> {
    standings.sort_by(|a, b| {
        b.progress
            .partial_cmp(&a.progress)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.joined_at.cmp(&b.joined_at))
    });
    standings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn standing(user_id: i64, progress: f64, joined_secs: i64) -> Standing {
        Standing {
            user_id,
            progress,
            joined_at: at(joined_secs),
        }
    }

    #[test]
    fn highest_progress_wins() {
        let ranked = rank(vec![
            standing(1, 80.0, 0),
            standing(2, 95.0, 10),
            standing(3, 60.0, 20),
        ]);
        assert_eq!(
            ranked.iter().map(|s| s.user_id).collect::<Vec<_>>(),
            vec![2, 1, 3]
        );
    }

    #[test]
    fn ties_break_by_earliest_join() {
        let ranked = rank(vec![
            standing(1, 100.0, 50),
            standing(2, 100.0, 10),
            standing(3, 40.0, 0),
        ]);
        assert_eq!(ranked[0].user_id, 2);
        assert_eq!(ranked[1].user_id, 1);
    }

    #[test]
    fn rank_equals_position_in_output() {
        let ranked = rank(vec![standing(5, 10.0, 0), standing(6, 90.0, 1)]);
        // winner at index 0, runner-up at index 1
        assert_eq!(ranked[0].user_id, 6);
        assert_eq!(ranked[1].user_id, 5);
    }

    #[test]
    fn zero_progress_everywhere_still_produces_a_winner() {
        let ranked = rank(vec![
            standing(1, 0.0, 30),
            standing(2, 0.0, 20),
            standing(3, 0.0, 10),
        ]);
        assert_eq!(ranked[0].user_id, 3);
    }
}
