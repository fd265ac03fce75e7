//! Arrears and streak projections.
//!
//! Read-only, recomputed on demand. Arrears figures reuse the settlement fee
//! assessment so the number shown to a member always matches what settlement
//! would actually charge if they paid right now.
//!
//! Streak counting is deliberately asymmetric: the current streak is anchored
//! at today walking backward and stops at the first calendar-day gap; the
//! longest streak is a free-floating maximum run over the whole history.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};

use crate::{
    core::fees,
    entities::{
        ContributionSchedule, Group, GroupModel, Membership, ScheduleStatus,
        contribution_schedule, membership,
    },
    errors::Result,
    models::{ArrearsReport, GroupArrears, StreakReport},
};

/// Ids of every membership a user holds, across all groups.
async fn membership_ids(db: &DatabaseConnection, user_id: &str) -> Result<Vec<i64>> {
    Ok(Membership::find()
        .filter(membership::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect())
}

/// Computes a user's arrears: every overdue schedule with its due date in the
/// past, with the late fee recomputed as settlement would charge it at `now`.
pub async fn arrears_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    now: DateTimeUtc,
) -> Result<ArrearsReport> {
    let ids = membership_ids(db, user_id).await?;
    if ids.is_empty() {
        return Ok(ArrearsReport {
            user_id: user_id.to_string(),
            total_arrears: 0.0,
            total_late_fees: 0.0,
            by_group: Vec::new(),
        });
    }

    let today = now.date_naive();
    let overdue = ContributionSchedule::find()
        .filter(contribution_schedule::Column::MembershipId.is_in(ids))
        .filter(contribution_schedule::Column::Status.eq(ScheduleStatus::Overdue))
        .filter(contribution_schedule::Column::DueDate.lt(today))
        .order_by_asc(contribution_schedule::Column::DueDate)
        .all(db)
        .await?;

    let group_ids: Vec<i64> = {
        let mut ids: Vec<i64> = overdue.iter().map(|s| s.group_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };
    let groups: HashMap<i64, GroupModel> = Group::find()
        .filter(crate::entities::group::Column::Id.is_in(group_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();

    let mut by_group: Vec<GroupArrears> = Vec::new();
    let mut total_arrears = 0.0;
    let mut total_late_fees = 0.0;
    for schedule in &overdue {
        let Some(group) = groups.get(&schedule.group_id) else {
            continue;
        };
        let assessment = fees::assess(
            schedule.due_date,
            schedule.grace_period_ends_at,
            now,
            group.late_fee,
        );

        total_arrears += schedule.amount;
        total_late_fees += assessment.late_fee;

        if let Some(entry) = by_group.iter_mut().find(|e| e.group_id == group.id) {
            entry.overdue_count += 1;
            entry.amount_owed += schedule.amount;
            entry.late_fees += assessment.late_fee;
        } else {
            by_group.push(GroupArrears {
                group_id: group.id,
                group_name: group.name.clone(),
                overdue_count: 1,
                amount_owed: schedule.amount,
                late_fees: assessment.late_fee,
            });
        }
    }

    Ok(ArrearsReport {
        user_id: user_id.to_string(),
        total_arrears,
        total_late_fees,
        by_group,
    })
}

/// Computes a user's on-time contribution streaks as of `today`.
///
/// The current streak counts consecutive paid due-dates with no calendar-day
/// gap, starting from the most recent; it is zero when the most recent paid
/// due-date is already more than a day behind `today`. A single missed day
/// breaks the walk for good, even if earlier dates run consecutively again.
pub async fn streaks_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<StreakReport> {
    let ids = membership_ids(db, user_id).await?;
    if ids.is_empty() {
        return Ok(StreakReport {
            current_streak: 0,
            longest_streak: 0,
            last_paid_due_date: None,
        });
    }

    let paid = ContributionSchedule::find()
        .filter(contribution_schedule::Column::MembershipId.is_in(ids))
        .filter(contribution_schedule::Column::Status.eq(ScheduleStatus::Paid))
        .order_by_desc(contribution_schedule::Column::DueDate)
        .all(db)
        .await?;

    // Distinct due dates, newest first (a user may pay in several groups)
    let mut dates: Vec<NaiveDate> = paid.iter().map(|s| s.due_date).collect();
    dates.dedup();

    let Some(&most_recent) = dates.first() else {
        return Ok(StreakReport {
            current_streak: 0,
            longest_streak: 0,
            last_paid_due_date: None,
        });
    };

    let current_streak = if today - most_recent <= Duration::days(1) {
        consecutive_run(&dates)
    } else {
        0
    };

    let mut longest_streak = 0;
    let mut remaining = dates.as_slice();
    while !remaining.is_empty() {
        let run = consecutive_run(remaining);
        longest_streak = longest_streak.max(run);
        remaining = &remaining[run as usize..];
    }

    Ok(StreakReport {
        current_streak,
        longest_streak,
        last_paid_due_date: Some(most_recent),
    })
}

/// Length of the consecutive-day run starting at the head of a descending
/// date list.
fn consecutive_run(dates: &[NaiveDate]) -> u32 {
    let mut run = 1u32;
    for pair in dates.windows(2) {
        if pair[0] - pair[1] == Duration::days(1) {
            run += 1;
        } else {
            break;
        }
    }
    run
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{
        date, insert_schedule_row, now_at, setup_active_group, setup_test_db,
    };

    #[tokio::test]
    async fn test_empty_history() -> Result<()> {
        let db = setup_test_db().await?;

        let arrears = arrears_for_user(&db, "nobody", now_at(2026, 1, 1, 0)).await?;
        assert_eq!(arrears.total_arrears, 0.0);
        assert!(arrears.by_group.is_empty());

        let streaks = streaks_for_user(&db, "nobody", date(2026, 1, 1)).await?;
        assert_eq!(streaks.current_streak, 0);
        assert_eq!(streaks.longest_streak, 0);
        assert_eq!(streaks.last_paid_due_date, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_arrears_matches_settlement_fee_logic() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 3, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;

        // Two days past the rotation start: sweep the first two schedules
        let now = now_at(2026, 1, 3, 12);
        crate::core::schedule::mark_overdue(&db, now).await?;

        let report = arrears_for_user(&db, "alice", now).await?;
        assert_eq!(report.total_arrears, 40.0);
        // 2026-01-01 is outside its 24h grace, 2026-01-02 is too by midday 01-03
        assert_eq!(report.total_late_fees, 10.0);
        assert_eq!(report.by_group.len(), 1);
        assert_eq!(report.by_group[0].overdue_count, 2);
        assert_eq!(report.by_group[0].group_id, group.id);

        // Settling one schedule shrinks the arrears accordingly
        let schedules = crate::core::schedule::schedules_for_membership(&db, member.id).await?;
        crate::core::contribution::settle(&db, schedules[0].id, "card", None, now).await?;
        let report = arrears_for_user(&db, "alice", now).await?;
        assert_eq!(report.total_arrears, 20.0);
        assert_eq!(report.by_group[0].overdue_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_overdue_within_grace_carries_no_fee_in_arrears() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 3, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;

        // Long grace on a hand-inserted row: overdue but still fee-free
        insert_schedule_row(
            &db,
            member.id,
            group.id,
            date(2026, 1, 1),
            Some(crate::core::fees::grace_period_end(date(2026, 1, 1), 96)),
            ScheduleStatus::Overdue,
            None,
        )
        .await?;

        let report = arrears_for_user(&db, "alice", now_at(2026, 1, 3, 0)).await?;
        assert_eq!(report.total_arrears, 20.0);
        assert_eq!(report.total_late_fees, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_streak_gap_fixture() -> Result<()> {
        // Paid on 01-01, 01-02, 01-03, gap at 01-04, paid 01-05.
        // From today = 01-05: current = 1, longest = 3.
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 6, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;

        for day in [1, 2, 3, 5] {
            insert_schedule_row(
                &db,
                member.id,
                group.id,
                date(2026, 1, day),
                None,
                ScheduleStatus::Paid,
                Some(now_at(2026, 1, day, 9)),
            )
            .await?;
        }

        let report = streaks_for_user(&db, "alice", date(2026, 1, 5)).await?;
        assert_eq!(report.current_streak, 1);
        assert_eq!(report.longest_streak, 3);
        assert_eq!(report.last_paid_due_date, Some(date(2026, 1, 5)));

        Ok(())
    }

    #[tokio::test]
    async fn test_unbroken_streak() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 6, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;

        for day in [1, 2, 3, 4] {
            insert_schedule_row(
                &db,
                member.id,
                group.id,
                date(2026, 1, day),
                None,
                ScheduleStatus::Paid,
                Some(now_at(2026, 1, day, 9)),
            )
            .await?;
        }

        let report = streaks_for_user(&db, "alice", date(2026, 1, 4)).await?;
        assert_eq!(report.current_streak, 4);
        assert_eq!(report.longest_streak, 4);

        Ok(())
    }

    #[tokio::test]
    async fn test_stale_history_zeroes_current_but_not_longest() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 6, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;

        for day in [1, 2, 3] {
            insert_schedule_row(
                &db,
                member.id,
                group.id,
                date(2026, 1, day),
                None,
                ScheduleStatus::Paid,
                Some(now_at(2026, 1, day, 9)),
            )
            .await?;
        }

        // A week later the run is history: current resets, longest survives
        let report = streaks_for_user(&db, "alice", date(2026, 1, 10)).await?;
        assert_eq!(report.current_streak, 0);
        assert_eq!(report.longest_streak, 3);

        Ok(())
    }
}
