//! Group entity - A rotating-savings cohort and its cadence configuration.
//!
//! A group fixes the contribution amount, rotation cadence, grace period, and
//! late fee at creation time. `start_date` is set when the group is activated
//! and anchors every generated schedule; once schedules exist the settings are
//! immutable except for administrative correction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a savings group.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum GroupStatus {
    /// Being configured by an administrator, not yet visible
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Accepting join requests, rotation not started
    #[sea_orm(string_value = "open")]
    Open,
    /// Rotation in progress
    #[sea_orm(string_value = "active")]
    Active,
    /// Temporarily frozen by an administrator
    #[sea_orm(string_value = "paused")]
    Paused,
    /// All turns finished and paid out
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Abandoned before completion
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Group database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    /// Unique identifier for the group
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable group name
    pub name: String,
    /// Fixed contribution amount per schedule entry
    pub daily_amount: f64,
    /// Days each member's turn lasts
    pub days_per_turn: i32,
    /// Number of member slots; also the number of schedule entries per member
    pub size: i32,
    /// Lump sum paid to each member when their turn arrives
    pub payout_amount: f64,
    /// Hours after a due date during which no late fee is charged
    pub grace_period_hours: i32,
    /// Flat fee charged on payments outside the grace period
    pub late_fee: f64,
    /// Lifecycle status
    pub status: GroupStatus,
    /// First contribution due-date; set on activation, anchors all schedules
    pub start_date: Option<Date>,
    /// User id of the administrator who created the group
    pub created_by: String,
    /// When the group was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Group and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One group has many memberships
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    /// One group has many payout schedules
    #[sea_orm(has_many = "super::payout_schedule::Entity")]
    PayoutSchedules,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::payout_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayoutSchedules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
