//! Audit and notification boundaries.
//!
//! Both collaborators are external: audit records go to a write-only sink and
//! notifications to a fire-and-forget dispatcher. Neither may fail a business
//! transaction, so these helpers emit structured `tracing` events at the
//! boundary and return nothing.

use tracing::info;

/// One audit record per state transition.
#[derive(Clone, Debug)]
pub struct AuditEntry<'a> {
    /// User id performing the transition ("system" for sweeps)
    pub actor: &'a str,
    /// Action name, e.g. "payout.approve"
    pub action: &'a str,
    /// Kind of resource touched, e.g. "payout"
    pub resource_type: &'a str,
    /// Id of the resource touched
    pub resource_id: i64,
    /// Free-form detail for the sink
    pub details: String,
}

/// Emits an audit record. Best-effort: the sink consumes the event stream and
/// a missing record never rolls anything back.
pub fn record(entry: &AuditEntry<'_>) {
    info!(
        target: "susu_engine::audit",
        actor = entry.actor,
        action = entry.action,
        resource_type = entry.resource_type,
        resource_id = entry.resource_id,
        details = %entry.details,
        "audit"
    );
}

/// Events forwarded to the external notification dispatcher.
#[derive(Clone, Debug)]
pub enum NotifyEvent {
    /// A contribution schedule was settled
    ContributionSettled {
        /// Schedule that was settled
        schedule_id: i64,
        /// Total collected including fees
        total_amount: f64,
    },
    /// Schedules were swept into the overdue state
    SchedulesOverdue {
        /// Number of schedules that became overdue
        count: u64,
    },
    /// A payout entered the workflow
    PayoutInitiated {
        /// The new payout
        payout_id: i64,
    },
    /// A payout reached the recipient's wallet
    PayoutPaid {
        /// The paid payout
        payout_id: i64,
        /// Amount credited
        amount: f64,
    },
    /// A payout attempt failed and may be retried
    PayoutFailed {
        /// The failed payout
        payout_id: i64,
        /// Provider-reported reason
        reason: String,
    },
}

/// Dispatches a notification. Fire-and-forget: delivery failures are the
/// dispatcher's problem, not the ledger's.
pub fn notify(event: &NotifyEvent) {
    info!(target: "susu_engine::notify", event = ?event, "notify");
}
