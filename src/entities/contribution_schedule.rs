//! `ContributionSchedule` entity - One contribution obligation per (membership, `due_date`).
//!
//! Rows are created in bulk when a membership becomes active in an active group,
//! with `amount` frozen at the group's `daily_amount` at generation time. Rows
//! are never deleted; `paid` and `missed` are terminal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a single contribution obligation.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ScheduleStatus {
    /// Not yet due, or due and not yet swept
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Settled; exactly one Contribution row references this schedule
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Past due and unpaid
    #[sea_orm(string_value = "overdue")]
    Overdue,
    /// Never paid; terminal
    #[sea_orm(string_value = "missed")]
    Missed,
}

/// Contribution schedule database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contribution_schedules")]
pub struct Model {
    /// Unique identifier for the schedule row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Membership this obligation belongs to
    pub membership_id: i64,
    /// Group the membership belongs to (denormalized for arrears queries)
    pub group_id: i64,
    /// Amount owed, frozen at generation time
    pub amount: f64,
    /// Calendar day the contribution is due
    pub due_date: Date,
    /// End of the fee-free window; `due_date` + group grace hours
    pub grace_period_ends_at: Option<DateTimeUtc>,
    /// Current status
    pub status: ScheduleStatus,
    /// When the schedule was settled
    pub paid_at: Option<DateTimeUtc>,
    /// Total collected at settlement, including any late fee
    pub paid_amount: Option<f64>,
    /// Whether settlement happened after the due date
    pub is_late: bool,
    /// Late fee charged at settlement (zero within grace)
    pub late_fee: f64,
}

/// Defines relationships between `ContributionSchedule` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each schedule belongs to one membership
    #[sea_orm(
        belongs_to = "super::membership::Entity",
        from = "Column::MembershipId",
        to = "super::membership::Column::Id"
    )]
    Membership,
    /// One schedule has at most one contribution
    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Membership.def()
    }
}

impl Related<super::contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
