//! Shared test utilities for the engine.
//!
//! Provides the in-memory database setup and factory helpers used by the
//! `#[cfg(test)]` modules across `core`.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, Set, prelude::*};

use crate::{
    core::{group, membership},
    entities::{self, GroupModel, MembershipModel, ScheduleStatus},
    errors::Result,
    models::Actor,
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The standard administrator actor for tests.
pub fn admin() -> Actor {
    Actor::admin("admin")
}

/// Builds a fixture date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Builds a fixture instant at the given hour UTC.
pub fn now_at(year: i32, month: u32, day: u32, hour: u32) -> DateTimeUtc {
    date(year, month, day)
        .and_hms_opt(hour, 0, 0)
        .unwrap()
        .and_utc()
}

/// Group parameters matching the standard fee fixtures:
/// `daily_amount`=20, 24h grace, `late_fee`=5, size 3, one day per turn.
pub fn test_new_group() -> group::NewGroup {
    group::NewGroup {
        name: "Test Group".to_string(),
        daily_amount: 20.0,
        days_per_turn: 1,
        size: 3,
        payout_amount: 60.0,
        grace_period_hours: 24,
        late_fee: 5.0,
    }
}

/// Creates a group of the given size and opens it for join requests.
pub async fn setup_open_group(db: &DatabaseConnection, size: i32) -> Result<GroupModel> {
    let mut params = test_new_group();
    params.size = size;
    let created = group::create_group(db, &admin(), params, now_at(2026, 1, 1, 0)).await?;
    group::open_group(db, &admin(), created.id).await
}

/// Creates a group, approves the given members, and activates the rotation at
/// `start_date`. Schedules and payout slots exist on return.
pub async fn setup_active_group(
    db: &DatabaseConnection,
    size: i32,
    start_date: NaiveDate,
    members: &[&str],
) -> Result<GroupModel> {
    let created = setup_open_group(db, size).await?;
    let now = start_date.and_hms_opt(0, 0, 0).unwrap().and_utc();

    for user_id in members {
        let request = membership::request_to_join(db, user_id, created.id, now).await?;
        membership::approve_membership(db, &admin(), request.id, now).await?;
    }

    group::activate_group(db, &admin(), created.id, start_date, now).await
}

/// Looks up a user's membership in a group.
pub async fn membership_of(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: &str,
) -> Result<MembershipModel> {
    Ok(entities::Membership::find()
        .filter(entities::MembershipColumn::GroupId.eq(group_id))
        .filter(entities::MembershipColumn::UserId.eq(user_id))
        .one(db)
        .await?
        .unwrap())
}

/// Inserts a contribution schedule row directly, bypassing generation. Used
/// by analytics tests that need hand-picked due dates and statuses.
pub async fn insert_schedule_row(
    db: &DatabaseConnection,
    membership_id: i64,
    group_id: i64,
    due_date: NaiveDate,
    grace_period_ends_at: Option<DateTimeUtc>,
    status: ScheduleStatus,
    paid_at: Option<DateTimeUtc>,
) -> Result<entities::ContributionScheduleModel> {
    let paid = status == ScheduleStatus::Paid;
    let model = entities::contribution_schedule::ActiveModel {
        membership_id: Set(membership_id),
        group_id: Set(group_id),
        amount: Set(20.0),
        due_date: Set(due_date),
        grace_period_ends_at: Set(grace_period_ends_at),
        status: Set(status),
        paid_at: Set(paid_at),
        paid_amount: Set(paid.then_some(20.0)),
        is_late: Set(false),
        late_fee: Set(0.0),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}
