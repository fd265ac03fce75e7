//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod contribution;
pub mod contribution_schedule;
pub mod group;
pub mod membership;
pub mod payout;
pub mod payout_schedule;
pub mod wallet;
pub mod wallet_transaction;
pub mod withdrawal_request;

// Re-export specific types to avoid conflicts
pub use contribution::{Column as ContributionColumn, Entity as Contribution, Model as ContributionModel};
pub use contribution_schedule::{
    Column as ContributionScheduleColumn, Entity as ContributionSchedule,
    Model as ContributionScheduleModel, ScheduleStatus,
};
pub use group::{Column as GroupColumn, Entity as Group, GroupStatus, Model as GroupModel};
pub use membership::{
    Column as MembershipColumn, Entity as Membership, MembershipStatus, Model as MembershipModel,
};
pub use payout::{Column as PayoutColumn, Entity as Payout, Model as PayoutModel, PayoutStatus};
pub use payout_schedule::{
    Column as PayoutScheduleColumn, Entity as PayoutSchedule, Model as PayoutScheduleModel,
    PayoutScheduleStatus,
};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel};
pub use wallet_transaction::{
    Column as WalletTransactionColumn, Entity as WalletTransaction,
    Model as WalletTransactionModel, WalletTransactionType,
};
pub use withdrawal_request::{
    Column as WithdrawalRequestColumn, Entity as WithdrawalRequest,
    Model as WithdrawalRequestModel, WithdrawalStatus,
};
