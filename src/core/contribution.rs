//! Contribution settlement.
//!
//! Settlement is triggered by the external payment confirmation; the money has
//! already moved, so the engine only records the obligation as discharged. The
//! Contribution insert and the schedule status flip happen in one transaction:
//! a paid schedule without its settlement record (or the reverse) must be
//! impossible.

use sea_orm::{ActiveEnum, DatabaseConnection, Set, TransactionTrait, prelude::*};

use crate::{
    core::{audit, fees, group as group_core, schedule as schedule_core},
    entities::{ContributionModel, ScheduleStatus, contribution, contribution_schedule},
    errors::{Error, Result},
};

/// Settles a contribution schedule, computing any late fee.
///
/// Fails `AlreadyPaid` when the schedule is already settled so a duplicate
/// payment confirmation is detectable rather than silently dropped. `missed`
/// is terminal and cannot be settled.
pub async fn settle(
    db: &DatabaseConnection,
    schedule_id: i64,
    payment_method: &str,
    payment_reference: Option<String>,
    now: DateTimeUtc,
) -> Result<ContributionModel> {
    let txn = db.begin().await?;

    let schedule = schedule_core::get_schedule_or_fail(&txn, schedule_id).await?;
    match schedule.status {
        ScheduleStatus::Paid => return Err(Error::AlreadyPaid { schedule_id }),
        ScheduleStatus::Missed => {
            return Err(Error::InvalidStatus {
                entity: "contribution schedule",
                id: schedule_id,
                expected: "pending or overdue",
                actual: schedule.status.to_value(),
            });
        }
        ScheduleStatus::Pending | ScheduleStatus::Overdue => {}
    }

    let group = group_core::get_group_or_fail(&txn, schedule.group_id).await?;
    let assessment = fees::assess(
        schedule.due_date,
        schedule.grace_period_ends_at,
        now,
        group.late_fee,
    );
    let total_amount = schedule.amount + assessment.late_fee;

    let record = contribution::ActiveModel {
        schedule_id: Set(schedule.id),
        membership_id: Set(schedule.membership_id),
        amount: Set(schedule.amount),
        late_fee: Set(assessment.late_fee),
        total_amount: Set(total_amount),
        is_late: Set(assessment.is_late),
        days_late: Set(assessment.days_late),
        payment_method: Set(payment_method.to_string()),
        payment_reference: Set(payment_reference),
        paid_at: Set(now),
        ..Default::default()
    };
    let result = record.insert(&txn).await?;

    let mut model: contribution_schedule::ActiveModel = schedule.into();
    model.status = Set(ScheduleStatus::Paid);
    model.paid_at = Set(Some(now));
    model.paid_amount = Set(Some(total_amount));
    model.is_late = Set(assessment.is_late);
    model.late_fee = Set(assessment.late_fee);
    model.update(&txn).await?;

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: "payment-confirmation",
        action: "contribution.settle",
        resource_type: "contribution_schedule",
        resource_id: schedule_id,
        details: format!("total_amount={total_amount} late_fee={}", assessment.late_fee),
    });
    audit::notify(&audit::NotifyEvent::ContributionSettled {
        schedule_id,
        total_amount,
    });
    Ok(result)
}
