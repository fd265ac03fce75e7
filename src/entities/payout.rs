//! Payout entity - A payout attempt moving through the approval workflow.
//!
//! Status drives the state machine `initiated → approved → paid`, with
//! `cancelled` and `failed` side branches. A failed payout may be retried
//! (same row, incremented `retry_count`); the wallet credit happens only on
//! the single `approved → paid` edge, so retries can never double-credit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a payout attempt.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PayoutStatus {
    /// Created from a scheduled slot, awaiting administrator review
    #[sea_orm(string_value = "initiated")]
    Initiated,
    /// Approved for disbursement
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Wallet credited; terminal
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Provider reported failure; may be re-approved and retried
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Declined by an administrator; terminal
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Payout database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payouts")]
pub struct Model {
    /// Unique identifier for the payout
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Payout schedule slot this attempt fulfils
    pub payout_schedule_id: i64,
    /// Group the payout belongs to
    pub group_id: i64,
    /// Membership being paid
    pub membership_id: i64,
    /// Recipient user id
    pub user_id: String,
    /// Amount to credit, copied from the payout schedule
    pub amount: f64,
    /// Workflow status
    pub status: PayoutStatus,
    /// Number of failed settlement attempts so far
    pub retry_count: i32,
    /// Reason reported on the most recent failure
    pub failure_reason: Option<String>,
    /// When the payout was initiated
    pub initiated_at: DateTimeUtc,
    /// When the payout was approved (metadata only)
    pub approved_at: Option<DateTimeUtc>,
    /// Administrator who approved or cancelled the payout
    pub approved_by: Option<String>,
    /// When the wallet was credited (metadata only)
    pub paid_at: Option<DateTimeUtc>,
}

/// Defines relationships between Payout and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payout fulfils one payout schedule slot
    #[sea_orm(
        belongs_to = "super::payout_schedule::Entity",
        from = "Column::PayoutScheduleId",
        to = "super::payout_schedule::Column::Id"
    )]
    PayoutSchedule,
}

impl Related<super::payout_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayoutSchedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
