//! Roadmap generation — duration bucket → ordered milestone templates.
//!
//! `generate_plan` is pure and deterministic; `generate_for_room` persists a
//! plan exactly once per room (a second call is a no-op, which settles the
//! race when multiple "room just became full" triggers fire concurrently).

use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::db::queries;
use crate::error::Result;
use crate::rooms::types::DurationBucket;

/// One milestone in a generated plan, with its checklist substeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneTemplate {
    pub title: String,
    pub description: String,
    pub week_number: i32,
    pub order_index: i32,
    pub substeps: Vec<String>,
}

/// Build the ordered milestone plan for a duration bucket.
pub fn generate_plan(bucket: DurationBucket) -> Vec<MilestoneTemplate> {
    let weeks = bucket.weeks();
    let mut plan = Vec::new();
    let mut order_index = 0;

    let mut push = |title: String, description: String, week: i32, substeps: Vec<String>| {
        plan.push(MilestoneTemplate {
            title,
            description,
            week_number: week,
            order_index,
            substeps,
        });
        order_index += 1;
    };

    // Week 1 is always the foundational pair. For one-week rooms this is the
    // whole plan — the mastery pair never doubles up on the same week.
    push(
        "Foundation & Setup".into(),
        "Get your environment, tools, and baseline routine in place".into(),
        1,
        vec![
            "Set up your training space and tools".into(),
            "Define your daily practice schedule".into(),
            "Record your starting point".into(),
        ],
    );
    push(
        "Initial Benchmark".into(),
        "Establish the baseline you will measure progress against".into(),
        1,
        vec![
            "Complete a full baseline attempt".into(),
            "Log your baseline numbers".into(),
            "Identify your biggest weakness".into(),
        ],
    );

    for week in 2..weeks {
        push(
            format!("Technique Refinement — Week {week}"),
            format!("Week {week}: focus on form and consistency over volume"),
            week,
            vec![
                format!("Complete week {week} technique drills"),
                "Review and correct one recurring mistake".into(),
                "Log every session this week".into(),
            ],
        );
        push(
            format!("Volume Increase — Week {week}"),
            format!("Week {week}: push past last week's totals"),
            week,
            vec![
                format!("Beat your week {} volume", week - 1),
                "Keep quality on par with last week".into(),
                "Note how recovery felt".into(),
            ],
        );
    }

    if weeks > 1 {
        push(
            "Mastery Challenge".into(),
            "Put everything together in one final push".into(),
            weeks,
            vec![
                "Attempt your hardest variation yet".into(),
                "Compare against your initial benchmark".into(),
                "Document the full attempt".into(),
            ],
        );
        push(
            "Final Submission".into(),
            "Submit your closing proof and wrap up".into(),
            weeks,
            vec![
                "Record your final result".into(),
                "Submit closing proof".into(),
                "Write a short retrospective".into(),
            ],
        );
    }

    plan
}

/// Persist the plan for a room. Idempotent: if a roadmap already exists (or a
/// concurrent caller wins the insert), nothing is written.
pub async fn generate_for_room(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    bucket: DurationBucket,
) -> Result<()> {
    if queries::get_roadmap_tx(tx, room_id).await?.is_some() {
        debug!(room_id, "roadmap already exists, skipping generation");
        return Ok(());
    }
    let roadmap_id = match queries::insert_roadmap(tx, room_id).await? {
        Some(id) => id,
        // Lost the insert race to a concurrent caller
        None => {
            debug!(room_id, "roadmap insert raced, skipping generation");
            return Ok(());
        }
    };

    for milestone in generate_plan(bucket) {
        let milestone_id = queries::insert_milestone(
            tx,
            roadmap_id,
            &milestone.title,
            &milestone.description,
            milestone.week_number,
            milestone.order_index,
        )
        .await?;
        for (i, substep) in milestone.substeps.iter().enumerate() {
            queries::insert_substep(tx, milestone_id, substep, i as i32).await?;
        }
    }
    debug!(room_id, roadmap_id, "roadmap generated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_table_drives_milestone_counts() {
        // 2 per week across first/middle/last iterations
        assert_eq!(generate_plan(DurationBucket::OneWeek).len(), 2);
        assert_eq!(generate_plan(DurationBucket::TwoWeeks).len(), 4);
        assert_eq!(generate_plan(DurationBucket::OneMonth).len(), 8);
        assert_eq!(generate_plan(DurationBucket::ThreeMonths).len(), 24);
    }

    #[test]
    fn one_week_room_gets_only_the_foundation_pair() {
        let plan = generate_plan(DurationBucket::OneWeek);
        assert_eq!(plan[0].title, "Foundation & Setup");
        assert_eq!(plan[1].title, "Initial Benchmark");
        assert!(plan.iter().all(|m| m.week_number == 1));
        assert!(!plan.iter().any(|m| m.title == "Mastery Challenge"));
    }

    #[test]
    fn multi_week_plan_ends_with_the_mastery_pair() {
        let plan = generate_plan(DurationBucket::OneMonth);
        let last_two: Vec<_> = plan.iter().rev().take(2).map(|m| m.title.as_str()).collect();
        assert_eq!(last_two, ["Final Submission", "Mastery Challenge"]);
        assert!(plan.iter().rev().take(2).all(|m| m.week_number == 4));
    }

    #[test]
    fn middle_weeks_substitute_their_week_number() {
        let plan = generate_plan(DurationBucket::OneMonth);
        let week3: Vec<_> = plan.iter().filter(|m| m.week_number == 3).collect();
        assert_eq!(week3.len(), 2);
        assert!(week3[0].title.contains("Week 3"));
        assert!(week3[1].description.contains("Week 3"));
    }

    #[test]
    fn order_index_is_stable_and_zero_based() {
        let plan = generate_plan(DurationBucket::ThreeMonths);
        for (i, milestone) in plan.iter().enumerate() {
            assert_eq!(milestone.order_index, i as i32);
        }
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(
            generate_plan(DurationBucket::TwoWeeks),
            generate_plan(DurationBucket::TwoWeeks)
        );
    }

    #[test]
    fn first_iteration_milestones_carry_three_substeps() {
        let plan = generate_plan(DurationBucket::OneWeek);
        assert!(plan.iter().all(|m| m.substeps.len() == 3));
    }
}
