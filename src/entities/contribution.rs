//! Contribution entity - Immutable settlement record.
//!
//! Created exactly once per contribution schedule that reaches `paid`, in the
//! same transaction as the schedule status flip. Never updated or deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contribution database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    /// Unique identifier for the contribution
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Schedule this contribution settles (at most one contribution per schedule)
    pub schedule_id: i64,
    /// Membership the schedule belongs to
    pub membership_id: i64,
    /// Base amount owed
    pub amount: f64,
    /// Late fee charged (zero within grace)
    pub late_fee: f64,
    /// `amount` + `late_fee`
    pub total_amount: f64,
    /// Whether payment came after the due date
    pub is_late: bool,
    /// Whole days between due date and payment (zero if on time)
    pub days_late: i32,
    /// How the member paid, e.g. "mobile_money", "card"
    pub payment_method: String,
    /// Opaque reference from the external payment confirmation
    pub payment_reference: Option<String>,
    /// When the payment was recorded
    pub paid_at: DateTimeUtc,
}

/// Defines relationships between Contribution and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each contribution settles one schedule
    #[sea_orm(
        belongs_to = "super::contribution_schedule::Entity",
        from = "Column::ScheduleId",
        to = "super::contribution_schedule::Column::Id"
    )]
    Schedule,
}

impl Related<super::contribution_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
