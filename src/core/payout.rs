//! Payout workflow - schedule slots and the approval state machine.
//!
//! One slot per (group, membership) ordered by turn position. A Payout row is
//! created when the slot leaves `scheduled` and then moves
//! `initiated → approved → paid`, with `cancelled` and `failed` branches. The
//! wallet credit is an effect of the single `approved → paid` edge inside
//! [`settle`], never performed speculatively, so a failed attempt can be
//! retried without ever double-crediting the recipient.

use chrono::Duration;
use sea_orm::{
    ActiveEnum, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};

use crate::{
    core::{audit, group as group_core, membership as membership_core, wallet as wallet_core},
    entities::{
        GroupModel, GroupStatus, MembershipModel, Payout, PayoutModel, PayoutSchedule,
        PayoutScheduleModel, PayoutScheduleStatus, PayoutStatus, WalletTransactionType, payout,
        payout_schedule,
    },
    errors::{Error, Result},
    models::Actor,
};

/// Creates the payout slot for one member.
///
/// The payout date falls at the end of the member's turn:
/// `start_date + turn_position * days_per_turn` days. Amount is frozen at the
/// group's configured `payout_amount`. Composes into the caller's transaction.
pub async fn create_slot<C>(
    conn: &C,
    group: &GroupModel,
    member: &MembershipModel,
) -> Result<PayoutScheduleModel>
where
    C: ConnectionTrait,
{
    let Some(start_date) = group.start_date else {
        return Err(Error::Config {
            message: format!("Group {} has no start date", group.id),
        });
    };
    let Some(position) = member.turn_position else {
        return Err(Error::Config {
            message: format!("Membership {} has no turn position", member.id),
        });
    };

    let existing = PayoutSchedule::find()
        .filter(payout_schedule::Column::MembershipId.eq(member.id))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Err(Error::AlreadyScheduled {
            membership_id: member.id,
        });
    }

    let payout_date =
        start_date + Duration::days(i64::from(position) * i64::from(group.days_per_turn));
    let model = payout_schedule::ActiveModel {
        group_id: Set(group.id),
        membership_id: Set(member.id),
        turn_position: Set(position),
        payout_amount: Set(group.payout_amount),
        payout_date: Set(payout_date),
        status: Set(PayoutScheduleStatus::Scheduled),
        ..Default::default()
    };
    model.insert(conn).await.map_err(Into::into)
}

/// Payout slots for a group ordered by turn position.
pub async fn slots_for_group(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Vec<PayoutScheduleModel>> {
    PayoutSchedule::find()
        .filter(payout_schedule::Column::GroupId.eq(group_id))
        .order_by_asc(payout_schedule::Column::TurnPosition)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Scheduled slots whose payout date has arrived. The scheduling cadence
/// feeds these into [`initiate`].
pub async fn due_slots(db: &DatabaseConnection, now: DateTimeUtc) -> Result<Vec<PayoutScheduleModel>> {
    PayoutSchedule::find()
        .filter(payout_schedule::Column::Status.eq(PayoutScheduleStatus::Scheduled))
        .filter(payout_schedule::Column::PayoutDate.lte(now.date_naive()))
        .order_by_asc(payout_schedule::Column::PayoutDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cancels every unprocessed slot of a group. Used when the group is cancelled.
pub(crate) async fn cancel_scheduled_slots<C>(conn: &C, group_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let result = PayoutSchedule::update_many()
        .col_expr(
            payout_schedule::Column::Status,
            Expr::value(PayoutScheduleStatus::Cancelled.to_value()),
        )
        .filter(payout_schedule::Column::GroupId.eq(group_id))
        .filter(payout_schedule::Column::Status.eq(PayoutScheduleStatus::Scheduled))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Cancels the unprocessed slot of one membership, if it has one. Used when a
/// member is removed.
pub(crate) async fn cancel_slot_for_membership<C>(conn: &C, membership_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let result = PayoutSchedule::update_many()
        .col_expr(
            payout_schedule::Column::Status,
            Expr::value(PayoutScheduleStatus::Cancelled.to_value()),
        )
        .filter(payout_schedule::Column::MembershipId.eq(membership_id))
        .filter(payout_schedule::Column::Status.eq(PayoutScheduleStatus::Scheduled))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Loads a payout or fails with [`Error::PayoutNotFound`].
async fn get_payout_or_fail<C>(conn: &C, payout_id: i64) -> Result<PayoutModel>
where
    C: ConnectionTrait,
{
    Payout::find_by_id(payout_id)
        .one(conn)
        .await?
        .ok_or(Error::PayoutNotFound { id: payout_id })
}

/// Initiates a payout from a scheduled slot.
///
/// Requires the group to be active and the slot still `scheduled`; anything
/// else fails `AlreadyProcessed` so racing initiators detect the loss.
pub async fn initiate(
    db: &DatabaseConnection,
    payout_schedule_id: i64,
    now: DateTimeUtc,
) -> Result<PayoutModel> {
    let txn = db.begin().await?;

    let slot = PayoutSchedule::find_by_id(payout_schedule_id)
        .one(&txn)
        .await?
        .ok_or(Error::PayoutNotFound {
            id: payout_schedule_id,
        })?;
    if slot.status != PayoutScheduleStatus::Scheduled {
        return Err(Error::AlreadyProcessed {
            entity: "payout schedule",
            id: slot.id,
            status: slot.status.to_value(),
        });
    }

    let group = group_core::get_group_or_fail(&txn, slot.group_id).await?;
    group_core::require_status(&group, GroupStatus::Active)?;

    let member = membership_core::get_membership_or_fail(&txn, slot.membership_id).await?;

    let model = payout::ActiveModel {
        payout_schedule_id: Set(slot.id),
        group_id: Set(slot.group_id),
        membership_id: Set(slot.membership_id),
        user_id: Set(member.user_id),
        amount: Set(slot.payout_amount),
        status: Set(PayoutStatus::Initiated),
        retry_count: Set(0),
        failure_reason: Set(None),
        initiated_at: Set(now),
        approved_at: Set(None),
        approved_by: Set(None),
        paid_at: Set(None),
        ..Default::default()
    };
    let result = model.insert(&txn).await?;

    let mut slot_model: payout_schedule::ActiveModel = slot.into();
    slot_model.status = Set(PayoutScheduleStatus::Processed);
    slot_model.update(&txn).await?;

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: "system",
        action: "payout.initiate",
        resource_type: "payout",
        resource_id: result.id,
        details: format!("schedule_id={payout_schedule_id} amount={}", result.amount),
    });
    audit::notify(&audit::NotifyEvent::PayoutInitiated {
        payout_id: result.id,
    });
    Ok(result)
}

/// Approves or cancels an initiated payout. Admin only.
///
/// Only `initiated` payouts can be decided; a second decision attempt fails
/// `AlreadyProcessed` rather than silently no-opping, so concurrent admins
/// can detect the race. Cancelling also cancels the underlying slot.
pub async fn approve(
    db: &DatabaseConnection,
    actor: &Actor,
    payout_id: i64,
    approved: bool,
    now: DateTimeUtc,
) -> Result<PayoutModel> {
    actor.require_admin("approve payout")?;

    let txn = db.begin().await?;

    let record = get_payout_or_fail(&txn, payout_id).await?;
    if record.status != PayoutStatus::Initiated {
        return Err(Error::AlreadyProcessed {
            entity: "payout",
            id: record.id,
            status: record.status.to_value(),
        });
    }

    let schedule_id = record.payout_schedule_id;
    let mut model: payout::ActiveModel = record.into();
    model.status = Set(if approved {
        PayoutStatus::Approved
    } else {
        PayoutStatus::Cancelled
    });
    model.approved_at = Set(Some(now));
    model.approved_by = Set(Some(actor.user_id.clone()));
    let result = model.update(&txn).await?;

    if !approved {
        use sea_orm::sea_query::Expr;

        PayoutSchedule::update_many()
            .col_expr(
                payout_schedule::Column::Status,
                Expr::value(PayoutScheduleStatus::Cancelled.to_value()),
            )
            .filter(payout_schedule::Column::Id.eq(schedule_id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: if approved {
            "payout.approve"
        } else {
            "payout.cancel"
        },
        resource_type: "payout",
        resource_id: payout_id,
        details: String::new(),
    });
    Ok(result)
}

/// Settles an approved payout against the provider outcome.
///
/// On success the recipient's wallet is credited (created if absent) and the
/// payout becomes terminal `paid`; the credit happens only on this edge, so
/// it occurs exactly once across any number of retries. On failure the payout
/// becomes `failed` with the reason recorded and `retry_count` bumped; the
/// wallet is untouched.
pub async fn settle(
    db: &DatabaseConnection,
    payout_id: i64,
    success: bool,
    failure_reason: Option<String>,
    now: DateTimeUtc,
) -> Result<PayoutModel> {
    let txn = db.begin().await?;

    let record = get_payout_or_fail(&txn, payout_id).await?;
    if record.status != PayoutStatus::Approved {
        return Err(Error::AlreadyProcessed {
            entity: "payout",
            id: record.id,
            status: record.status.to_value(),
        });
    }

    let result = if success {
        let recipient = wallet_core::get_or_create(&txn, &record.user_id, now).await?;
        wallet_core::adjust(
            &txn,
            recipient.id,
            record.amount,
            WalletTransactionType::Payout,
            Some(format!("payout:{}", record.id)),
            now,
        )
        .await?;

        let mut model: payout::ActiveModel = record.into();
        model.status = Set(PayoutStatus::Paid);
        model.paid_at = Set(Some(now));
        model.failure_reason = Set(None);
        model.update(&txn).await?
    } else {
        let retries = record.retry_count + 1;
        let mut model: payout::ActiveModel = record.into();
        model.status = Set(PayoutStatus::Failed);
        model.failure_reason = Set(failure_reason.clone());
        model.retry_count = Set(retries);
        model.update(&txn).await?
    };

    txn.commit().await?;

    if success {
        audit::record(&audit::AuditEntry {
            actor: "system",
            action: "payout.settle",
            resource_type: "payout",
            resource_id: payout_id,
            details: format!("amount={}", result.amount),
        });
        audit::notify(&audit::NotifyEvent::PayoutPaid {
            payout_id,
            amount: result.amount,
        });
    } else {
        let reason = failure_reason.unwrap_or_default();
        audit::record(&audit::AuditEntry {
            actor: "system",
            action: "payout.fail",
            resource_type: "payout",
            resource_id: payout_id,
            details: format!("reason={reason} retry_count={}", result.retry_count),
        });
        audit::notify(&audit::NotifyEvent::PayoutFailed {
            payout_id,
            reason,
        });
    }
    Ok(result)
}

/// Re-submits a failed payout for settlement. Admin only.
///
/// This is the business retry path, not fault tolerance: the payout returns
/// to `approved` and goes through [`settle`] again.
pub async fn retry(
    db: &DatabaseConnection,
    actor: &Actor,
    payout_id: i64,
    now: DateTimeUtc,
) -> Result<PayoutModel> {
    actor.require_admin("retry payout")?;

    let record = get_payout_or_fail(db, payout_id).await?;
    if record.status != PayoutStatus::Failed {
        return Err(Error::AlreadyProcessed {
            entity: "payout",
            id: record.id,
            status: record.status.to_value(),
        });
    }

    let mut model: payout::ActiveModel = record.into();
    model.status = Set(PayoutStatus::Approved);
    model.approved_at = Set(Some(now));
    model.approved_by = Set(Some(actor.user_id.clone()));
    let result = model.update(db).await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "payout.retry",
        resource_type: "payout",
        resource_id: payout_id,
        details: format!("retry_count={}", result.retry_count),
    });
    Ok(result)
}
