//! `PayoutSchedule` entity - One planned payout per (group, membership).
//!
//! Rows are ordered by `turn_position` and carry the target payout date. A
//! Payout row is created when the schedule leaves `scheduled`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a planned payout slot.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PayoutScheduleStatus {
    /// Waiting for the member's turn
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// A payout has been initiated for this slot
    #[sea_orm(string_value = "processed")]
    Processed,
    /// Slot cancelled (group cancelled or member removed)
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Payout schedule database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payout_schedules")]
pub struct Model {
    /// Unique identifier for the payout schedule
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the slot belongs to
    pub group_id: i64,
    /// Membership receiving this payout
    pub membership_id: i64,
    /// The member's turn position, copied at generation time
    pub turn_position: i32,
    /// Lump sum to pay, frozen at the group's `payout_amount`
    pub payout_amount: f64,
    /// Target date the payout becomes due
    pub payout_date: Date,
    /// Current status
    pub status: PayoutScheduleStatus,
}

/// Defines relationships between `PayoutSchedule` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payout schedule belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    /// One payout schedule has many payout attempts
    #[sea_orm(has_many = "super::payout::Entity")]
    Payouts,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::payout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payouts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
