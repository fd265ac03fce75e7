//! Unified error types for the engine.
//!
//! Every business error carries the entity id and enough state for the
//! surrounding application to render a specific message; nothing here should
//! crash the process. Infrastructure failures (database, I/O, configuration)
//! get their own variants with `#[from]` conversions.

use thiserror::Error;

/// All errors produced by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with a descriptive message
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// TOML configuration parse error
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Referenced group does not exist
    #[error("Group {id} not found")]
    GroupNotFound {
        /// Group id
        id: i64,
    },

    /// Referenced membership does not exist
    #[error("Membership {id} not found")]
    MembershipNotFound {
        /// Membership id
        id: i64,
    },

    /// Referenced contribution schedule does not exist
    #[error("Contribution schedule {id} not found")]
    ScheduleNotFound {
        /// Schedule id
        id: i64,
    },

    /// Referenced payout or payout schedule does not exist
    #[error("Payout {id} not found")]
    PayoutNotFound {
        /// Payout id
        id: i64,
    },

    /// Referenced wallet does not exist
    #[error("Wallet not found for {owner}")]
    WalletNotFound {
        /// Owning user id or wallet id description
        owner: String,
    },

    /// Referenced withdrawal request does not exist
    #[error("Withdrawal request {id} not found")]
    WithdrawalNotFound {
        /// Withdrawal request id
        id: i64,
    },

    /// Contribution schedule has already been settled
    #[error("Contribution schedule {schedule_id} is already paid")]
    AlreadyPaid {
        /// Schedule id
        schedule_id: i64,
    },

    /// Record already moved past the state the operation requires
    #[error("{entity} {id} already processed (status: {status})")]
    AlreadyProcessed {
        /// Entity kind, e.g. "payout" or "withdrawal request"
        entity: &'static str,
        /// Record id
        id: i64,
        /// Current status of the record
        status: String,
    },

    /// Contribution schedules were already generated for this membership
    #[error("Schedules already generated for membership {membership_id}")]
    AlreadyScheduled {
        /// Membership id
        membership_id: i64,
    },

    /// Entity is in the wrong lifecycle state for the requested operation
    #[error("{entity} {id} has status {actual}, expected {expected}")]
    InvalidStatus {
        /// Entity kind, e.g. "group" or "membership"
        entity: &'static str,
        /// Entity id
        id: i64,
        /// Status the operation requires
        expected: &'static str,
        /// Status the entity actually has
        actual: String,
    },

    /// User already holds a live membership or pending request in the group
    #[error("User {user_id} already has a membership in group {group_id}")]
    AlreadyMember {
        /// Group id
        group_id: i64,
        /// User id
        user_id: String,
    },

    /// Group already holds its configured number of members
    #[error("Group {group_id} is full ({size} members)")]
    GroupFull {
        /// Group id
        group_id: i64,
        /// Configured group size
        size: i32,
    },

    /// Wallet balance cannot cover the requested amount
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Balance currently available
        available: f64,
        /// Amount the caller asked for
        requested: f64,
    },

    /// Caller's role does not permit the operation
    #[error("Forbidden: {action} requires an administrator")]
    Forbidden {
        /// The attempted action
        action: &'static str,
    },

    /// Operation attempted outside its valid time window
    #[error("Withdrawal request {id} expired at {expired_at}")]
    ExpiredWindow {
        /// Withdrawal request id
        id: i64,
        /// When the window closed
        expired_at: chrono::DateTime<chrono::Utc>,
    },

    /// Amount is zero, negative, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: f64,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
