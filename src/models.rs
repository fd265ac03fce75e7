//! Non-persisted domain types shared across the core modules.
//!
//! The engine trusts the identity provider upstream: every call that needs
//! authorization receives an [`Actor`] carrying the authenticated user id and
//! role. Analytics report types live here too since they are projections, not
//! stored rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Role attached to an authenticated caller by the identity provider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Regular group member
    Member,
    /// Administrator - may approve memberships, payouts, and withdrawals
    Admin,
}

/// An authenticated caller, as supplied by the external identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Authenticated user id
    pub user_id: String,
    /// Role asserted by the identity provider
    pub role: Role,
}

impl Actor {
    /// Builds an admin actor.
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    /// Builds a regular member actor.
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Member,
        }
    }

    /// Fails with [`Error::Forbidden`] unless the actor is an administrator.
    pub fn require_admin(&self, action: &'static str) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(Error::Forbidden { action })
        }
    }
}

/// Arrears owed within a single group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupArrears {
    /// Group id
    pub group_id: i64,
    /// Group name
    pub group_name: String,
    /// Number of overdue schedules in this group
    pub overdue_count: usize,
    /// Sum of overdue schedule amounts (excluding fees)
    pub amount_owed: f64,
    /// Late fees that settlement would charge if paid now
    pub late_fees: f64,
}

/// Aggregate arrears across all of a user's groups.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrearsReport {
    /// User the report is for
    pub user_id: String,
    /// Total owed across groups, excluding fees
    pub total_arrears: f64,
    /// Total late fees that would be charged if settled now
    pub total_late_fees: f64,
    /// Per-group breakdown
    pub by_group: Vec<GroupArrears>,
}

/// On-time contribution streaks for a user.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreakReport {
    /// Consecutive paid due-dates ending at the most recent paid one
    pub current_streak: u32,
    /// Longest run of consecutive paid due-dates anywhere in the history
    pub longest_streak: u32,
    /// Most recent paid due-date, if any
    pub last_paid_due_date: Option<NaiveDate>,
}
