//! Contribution schedule generation and the overdue/missed sweeps.
//!
//! Generation is a generate-once bulk insert: one row per day of the full
//! rotation with the amount frozen at the group's current `daily_amount`.
//! Re-invocation for the same membership fails `AlreadyScheduled`.

use chrono::Duration;
use sea_orm::{DatabaseConnection, PaginatorTrait, QueryOrder, Set, prelude::*};
use tracing::debug;

use crate::{
    core::{audit, fees},
    entities::{
        ContributionSchedule, ContributionScheduleModel, GroupModel, GroupStatus, MembershipModel,
        ScheduleStatus, contribution_schedule,
    },
    errors::{Error, Result},
};

/// Loads a schedule row or fails with [`Error::ScheduleNotFound`].
pub(crate) async fn get_schedule_or_fail<C>(
    conn: &C,
    schedule_id: i64,
) -> Result<ContributionScheduleModel>
where
    C: ConnectionTrait,
{
    ContributionSchedule::find_by_id(schedule_id)
        .one(conn)
        .await?
        .ok_or(Error::ScheduleNotFound { id: schedule_id })
}

/// Generates the full set of contribution schedules for one membership.
///
/// Requires the group to be active with a start date. Produces `group.size`
/// rows: due dates `start_date`, `start_date + 1 day`, ..., each with a grace
/// window of the group's configured hours. Independent of other members'
/// schedules, so it composes into the caller's transaction.
pub async fn generate_for_membership<C>(
    conn: &C,
    group: &GroupModel,
    member: &MembershipModel,
) -> Result<Vec<ContributionScheduleModel>>
where
    C: ConnectionTrait,
{
    if group.status != GroupStatus::Active {
        return Err(Error::InvalidStatus {
            entity: "group",
            id: group.id,
            expected: "active",
            actual: sea_orm::ActiveEnum::to_value(&group.status),
        });
    }
    let Some(start_date) = group.start_date else {
        return Err(Error::Config {
            message: format!("Group {} has no start date", group.id),
        });
    };

    let existing = ContributionSchedule::find()
        .filter(contribution_schedule::Column::MembershipId.eq(member.id))
        .count(conn)
        .await?;
    if existing > 0 {
        return Err(Error::AlreadyScheduled {
            membership_id: member.id,
        });
    }

    let rows = (0..group.size).map(|i| {
        let due_date = start_date + Duration::days(i64::from(i));
        contribution_schedule::ActiveModel {
            membership_id: Set(member.id),
            group_id: Set(group.id),
            amount: Set(group.daily_amount),
            due_date: Set(due_date),
            grace_period_ends_at: Set(Some(fees::grace_period_end(
                due_date,
                group.grace_period_hours,
            ))),
            status: Set(ScheduleStatus::Pending),
            paid_at: Set(None),
            paid_amount: Set(None),
            is_late: Set(false),
            late_fee: Set(0.0),
            ..Default::default()
        }
    });
    ContributionSchedule::insert_many(rows).exec(conn).await?;

    debug!(
        membership_id = member.id,
        group_id = group.id,
        count = group.size,
        "generated contribution schedules"
    );

    schedules_for_membership(conn, member.id).await
}

/// All schedules for a membership, ordered by due date.
pub async fn schedules_for_membership<C>(
    conn: &C,
    membership_id: i64,
) -> Result<Vec<ContributionScheduleModel>>
where
    C: ConnectionTrait,
{
    ContributionSchedule::find()
        .filter(contribution_schedule::Column::MembershipId.eq(membership_id))
        .order_by_asc(contribution_schedule::Column::DueDate)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Sweeps pending schedules whose due date has passed into `overdue`.
///
/// Idempotent; intended to run on a cadence. Returns the number of rows swept.
pub async fn mark_overdue(db: &DatabaseConnection, now: DateTimeUtc) -> Result<u64> {
    use sea_orm::sea_query::Expr;

    let today = now.date_naive();
    let result = ContributionSchedule::update_many()
        .col_expr(
            contribution_schedule::Column::Status,
            Expr::value(sea_orm::ActiveEnum::to_value(&ScheduleStatus::Overdue)),
        )
        .filter(contribution_schedule::Column::Status.eq(ScheduleStatus::Pending))
        .filter(contribution_schedule::Column::DueDate.lt(today))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        audit::notify(&audit::NotifyEvent::SchedulesOverdue {
            count: result.rows_affected,
        });
    }
    Ok(result.rows_affected)
}

/// Marks every unpaid schedule of a group as terminal `missed`. Used when the
/// group completes.
pub(crate) async fn mark_missed_for_group<C>(conn: &C, group_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let result = ContributionSchedule::update_many()
        .col_expr(
            contribution_schedule::Column::Status,
            Expr::value(sea_orm::ActiveEnum::to_value(&ScheduleStatus::Missed)),
        )
        .filter(contribution_schedule::Column::GroupId.eq(group_id))
        .filter(
            contribution_schedule::Column::Status
                .is_in([ScheduleStatus::Pending, ScheduleStatus::Overdue]),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{date, now_at, setup_active_group, setup_test_db};

    #[tokio::test]
    async fn test_generation_produces_one_row_per_rotation_day() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 3, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;

        let schedules = schedules_for_membership(&db, member.id).await?;
        assert_eq!(schedules.len(), 3);
        assert_eq!(schedules[0].due_date, date(2026, 1, 1));
        assert_eq!(schedules[1].due_date, date(2026, 1, 2));
        assert_eq!(schedules[2].due_date, date(2026, 1, 3));

        // Amount and grace frozen at generation time
        assert_eq!(schedules[0].amount, 20.0);
        assert_eq!(
            schedules[0].grace_period_ends_at,
            Some(fees::grace_period_end(date(2026, 1, 1), 24))
        );
        assert_eq!(schedules[0].status, ScheduleStatus::Pending);

        Ok(())
    }

    #[tokio::test]
    async fn test_regeneration_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 3, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;
        let group_model = crate::core::group::get_group_or_fail(&db, group.id).await?;

        let result = generate_for_membership(&db, &group_model, &member).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::AlreadyScheduled { .. }
        ));

        // Still exactly one rotation's worth of rows
        let schedules = schedules_for_membership(&db, member.id).await?;
        assert_eq!(schedules.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_mark_overdue_sweeps_only_past_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 3, date(2026, 1, 1), &["alice"]).await?;
        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;

        // Day three of the rotation: the first two schedules are past due
        let swept = mark_overdue(&db, now_at(2026, 1, 3, 10)).await?;
        assert_eq!(swept, 2);

        let schedules = schedules_for_membership(&db, member.id).await?;
        assert_eq!(schedules[0].status, ScheduleStatus::Overdue);
        assert_eq!(schedules[1].status, ScheduleStatus::Overdue);
        assert_eq!(schedules[2].status, ScheduleStatus::Pending);

        // Idempotent
        let again = mark_overdue(&db, now_at(2026, 1, 3, 10)).await?;
        assert_eq!(again, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_due_today_is_not_overdue() -> Result<()> {
        let db = setup_test_db().await?;
        let group = setup_active_group(&db, 3, date(2026, 1, 1), &["alice"]).await?;

        let swept = mark_overdue(&db, now_at(2026, 1, 1, 23)).await?;
        assert_eq!(swept, 0);

        let member = crate::test_utils::membership_of(&db, group.id, "alice").await?;
        let schedules = schedules_for_membership(&db, member.id).await?;
        assert!(schedules.iter().all(|s| s.status == ScheduleStatus::Pending));

        Ok(())
    }
}
