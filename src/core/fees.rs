//! Late-fee and grace-period assessment.
//!
//! Contribution settlement and the arrears projection must charge the same
//! fee for the same schedule at the same instant, so the computation lives in
//! this single pure function rather than being duplicated at both call sites.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Outcome of assessing a schedule against the clock.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LateFeeAssessment {
    /// Whether `now` falls on a later calendar day than the due date
    pub is_late: bool,
    /// Whether `now` is still inside the fee-free grace window
    pub within_grace: bool,
    /// Fee to charge: the group's late fee when late and outside grace, else zero
    pub late_fee: f64,
    /// Whole days between the due date and `now` (zero when on time)
    pub days_late: i32,
}

/// Assesses lateness and the fee a settlement at `now` would charge.
///
/// A payment is late when it lands on a calendar day after `due_date`. The fee
/// applies only when the payment is late and the grace window (if any) has
/// closed; `days_late` counts whole calendar days regardless of grace.
pub fn assess(
    due_date: NaiveDate,
    grace_period_ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    late_fee_amount: f64,
) -> LateFeeAssessment {
    let today = now.date_naive();
    let is_late = today > due_date;
    let within_grace = grace_period_ends_at.is_some_and(|ends| now < ends);
    let late_fee = if is_late && !within_grace {
        late_fee_amount
    } else {
        0.0
    };
    #[allow(clippy::cast_possible_truncation)]
    let days_late = if is_late {
        (today - due_date).num_days() as i32
    } else {
        0
    };

    LateFeeAssessment {
        is_late,
        within_grace,
        late_fee,
        days_late,
    }
}

/// Computes the end of the grace window for a due date: midnight UTC of the
/// due date plus the group's configured grace hours.
pub fn grace_period_end(due_date: NaiveDate, grace_period_hours: i32) -> DateTime<Utc> {
    due_date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(i64::from(grace_period_hours))
}
