//! Group lifecycle - Creation and guarded status transitions.
//!
//! A group moves `draft → open → active → completed`, with `paused` and
//! `cancelled` side branches. Activation fixes `start_date` and generates
//! contribution schedules and payout slots for every already-approved member
//! in one transaction; members approved later get theirs at approval time.

use chrono::NaiveDate;
use sea_orm::{ActiveEnum, DatabaseConnection, Set, TransactionTrait, prelude::*};

use crate::{
    core::{audit, membership as membership_core, payout as payout_core, schedule as schedule_core},
    entities::{Group, GroupModel, GroupStatus, group},
    errors::{Error, Result},
    models::Actor,
};

/// Parameters for creating a group.
#[derive(Clone, Debug)]
pub struct NewGroup {
    /// Human-readable name
    pub name: String,
    /// Contribution amount per schedule entry
    pub daily_amount: f64,
    /// Days each member's turn lasts
    pub days_per_turn: i32,
    /// Number of member slots
    pub size: i32,
    /// Lump sum per payout
    pub payout_amount: f64,
    /// Fee-free hours after each due date
    pub grace_period_hours: i32,
    /// Flat fee for payments outside grace
    pub late_fee: f64,
}

/// Fails unless the group currently has the expected status.
pub(crate) fn require_status(group: &GroupModel, expected: GroupStatus) -> Result<()> {
    if group.status == expected {
        Ok(())
    } else {
        Err(Error::InvalidStatus {
            entity: "group",
            id: group.id,
            expected: match expected {
                GroupStatus::Draft => "draft",
                GroupStatus::Open => "open",
                GroupStatus::Active => "active",
                GroupStatus::Paused => "paused",
                GroupStatus::Completed => "completed",
                GroupStatus::Cancelled => "cancelled",
            },
            actual: group.status.to_value(),
        })
    }
}

/// Loads a group or fails with [`Error::GroupNotFound`].
pub(crate) async fn get_group_or_fail<C>(conn: &C, group_id: i64) -> Result<GroupModel>
where
    C: ConnectionTrait,
{
    Group::find_by_id(group_id)
        .one(conn)
        .await?
        .ok_or(Error::GroupNotFound { id: group_id })
}

/// Creates a group in `draft` status. Admin only.
pub async fn create_group(
    db: &DatabaseConnection,
    actor: &Actor,
    new_group: NewGroup,
    now: DateTimeUtc,
) -> Result<GroupModel> {
    actor.require_admin("create group")?;

    if new_group.name.trim().is_empty() {
        return Err(Error::Config {
            message: "Group name cannot be empty".to_string(),
        });
    }
    for amount in [new_group.daily_amount, new_group.payout_amount] {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(Error::InvalidAmount { amount });
        }
    }
    if !(new_group.late_fee.is_finite() && new_group.late_fee >= 0.0) {
        return Err(Error::InvalidAmount {
            amount: new_group.late_fee,
        });
    }
    if new_group.size < 2 {
        return Err(Error::Config {
            message: format!("Group size must be at least 2, got {}", new_group.size),
        });
    }
    if new_group.days_per_turn < 1 {
        return Err(Error::Config {
            message: format!(
                "Days per turn must be at least 1, got {}",
                new_group.days_per_turn
            ),
        });
    }
    if new_group.grace_period_hours < 0 {
        return Err(Error::Config {
            message: format!(
                "Grace period cannot be negative, got {} hours",
                new_group.grace_period_hours
            ),
        });
    }

    let model = group::ActiveModel {
        name: Set(new_group.name.trim().to_string()),
        daily_amount: Set(new_group.daily_amount),
        days_per_turn: Set(new_group.days_per_turn),
        size: Set(new_group.size),
        payout_amount: Set(new_group.payout_amount),
        grace_period_hours: Set(new_group.grace_period_hours),
        late_fee: Set(new_group.late_fee),
        status: Set(GroupStatus::Draft),
        start_date: Set(None),
        created_by: Set(actor.user_id.clone()),
        created_at: Set(now),
        ..Default::default()
    };
    let result = model.insert(db).await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "group.create",
        resource_type: "group",
        resource_id: result.id,
        details: format!("name={}", result.name),
    });
    Ok(result)
}

/// Opens a draft group for join requests. Admin only.
pub async fn open_group(db: &DatabaseConnection, actor: &Actor, group_id: i64) -> Result<GroupModel> {
    actor.require_admin("open group")?;

    let group = get_group_or_fail(db, group_id).await?;
    require_status(&group, GroupStatus::Draft)?;

    let mut model: group::ActiveModel = group.into();
    model.status = Set(GroupStatus::Open);
    let result = model.update(db).await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "group.open",
        resource_type: "group",
        resource_id: group_id,
        details: String::new(),
    });
    Ok(result)
}

/// Activates an open group, fixing `start_date` and generating contribution
/// schedules and payout slots for every approved member. Admin only.
///
/// Everything runs in one transaction: a crash cannot leave the group active
/// with half its schedules generated.
pub async fn activate_group(
    db: &DatabaseConnection,
    actor: &Actor,
    group_id: i64,
    start_date: NaiveDate,
    now: DateTimeUtc,
) -> Result<GroupModel> {
    actor.require_admin("activate group")?;

    let txn = db.begin().await?;

    let group = get_group_or_fail(&txn, group_id).await?;
    require_status(&group, GroupStatus::Open)?;

    let mut model: group::ActiveModel = group.into();
    model.status = Set(GroupStatus::Active);
    model.start_date = Set(Some(start_date));
    let activated = model.update(&txn).await?;

    let approved = membership_core::approved_members(&txn, group_id).await?;
    for member in approved {
        schedule_core::generate_for_membership(&txn, &activated, &member).await?;
        payout_core::create_slot(&txn, &activated, &member).await?;
        membership_core::mark_active(&txn, member).await?;
    }

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "group.activate",
        resource_type: "group",
        resource_id: group_id,
        details: format!("start_date={start_date}"),
    });
    Ok(activated)
}

/// Pauses an active group. Admin only.
pub async fn pause_group(db: &DatabaseConnection, actor: &Actor, group_id: i64) -> Result<GroupModel> {
    actor.require_admin("pause group")?;

    let group = get_group_or_fail(db, group_id).await?;
    require_status(&group, GroupStatus::Active)?;

    let mut model: group::ActiveModel = group.into();
    model.status = Set(GroupStatus::Paused);
    let result = model.update(db).await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "group.pause",
        resource_type: "group",
        resource_id: group_id,
        details: String::new(),
    });
    Ok(result)
}

/// Resumes a paused group. Admin only.
pub async fn resume_group(
    db: &DatabaseConnection,
    actor: &Actor,
    group_id: i64,
) -> Result<GroupModel> {
    actor.require_admin("resume group")?;

    let group = get_group_or_fail(db, group_id).await?;
    require_status(&group, GroupStatus::Paused)?;

    let mut model: group::ActiveModel = group.into();
    model.status = Set(GroupStatus::Active);
    let result = model.update(db).await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "group.resume",
        resource_type: "group",
        resource_id: group_id,
        details: String::new(),
    });
    Ok(result)
}

/// Completes an active group. Remaining unpaid schedules become terminal
/// `missed`. Admin only.
pub async fn complete_group(
    db: &DatabaseConnection,
    actor: &Actor,
    group_id: i64,
) -> Result<GroupModel> {
    actor.require_admin("complete group")?;

    let txn = db.begin().await?;

    let group = get_group_or_fail(&txn, group_id).await?;
    require_status(&group, GroupStatus::Active)?;

    let missed = schedule_core::mark_missed_for_group(&txn, group_id).await?;
    membership_core::complete_active_members(&txn, group_id).await?;

    let mut model: group::ActiveModel = group.into();
    model.status = Set(GroupStatus::Completed);
    let result = model.update(&txn).await?;

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "group.complete",
        resource_type: "group",
        resource_id: group_id,
        details: format!("missed_schedules={missed}"),
    });
    Ok(result)
}

/// Cancels a group that has not completed. Unprocessed payout slots are
/// cancelled alongside it. Admin only.
pub async fn cancel_group(
    db: &DatabaseConnection,
    actor: &Actor,
    group_id: i64,
) -> Result<GroupModel> {
    actor.require_admin("cancel group")?;

    let txn = db.begin().await?;

    let group = get_group_or_fail(&txn, group_id).await?;
    if matches!(group.status, GroupStatus::Completed | GroupStatus::Cancelled) {
        return Err(Error::InvalidStatus {
            entity: "group",
            id: group.id,
            expected: "draft, open, active or paused",
            actual: group.status.to_value(),
        });
    }

    payout_core::cancel_scheduled_slots(&txn, group_id).await?;

    let mut model: group::ActiveModel = group.into();
    model.status = Set(GroupStatus::Cancelled);
    let result = model.update(&txn).await?;

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "group.cancel",
        resource_type: "group",
        resource_id: group_id,
        details: String::new(),
    });
    Ok(result)
}
