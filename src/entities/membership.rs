//! Membership entity - Links a user to a group.
//!
//! `turn_position` is a 1-based rank unique within the group, assigned only on
//! approval and never reused even if the member is later removed (gaps are
//! tolerated, collisions are not). `approved_at` is pure metadata; control
//! state lives in `status` alone.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a membership.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum MembershipStatus {
    /// Join request awaiting administrator review
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted into the group; turn position assigned
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Contributing in an active rotation
    #[sea_orm(string_value = "active")]
    Active,
    /// Rotation finished for this member
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Removed by an administrator; turn position retained
    #[sea_orm(string_value = "removed")]
    Removed,
    /// Banned from the group
    #[sea_orm(string_value = "banned")]
    Banned,
    /// Join request declined
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Membership database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "memberships")]
pub struct Model {
    /// Unique identifier for the membership
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group this membership belongs to
    pub group_id: i64,
    /// User holding the membership
    pub user_id: String,
    /// Lifecycle status
    pub status: MembershipStatus,
    /// 1-based payout rank within the group; set on approval, never reused
    pub turn_position: Option<i32>,
    /// When the join request was made
    pub joined_at: DateTimeUtc,
    /// When the membership was approved (metadata only)
    pub approved_at: Option<DateTimeUtc>,
}

/// Defines relationships between Membership and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    /// One membership has many contribution schedules
    #[sea_orm(has_many = "super::contribution_schedule::Entity")]
    ContributionSchedules,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::contribution_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContributionSchedules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
