//! Wallet entity - Per-user balance and cumulative totals.
//!
//! The balance is mutated only through `WalletTransaction` records that pair a
//! delta with before/after balances. `pending_balance` holds reservations for
//! in-flight withdrawal requests and is not spendable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// Unique identifier for the wallet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user; one wallet per user
    #[sea_orm(unique)]
    pub user_id: String,
    /// Spendable balance
    pub balance: f64,
    /// Amount reserved for in-flight withdrawal requests
    pub pending_balance: f64,
    /// Lifetime sum of deposits
    pub total_deposited: f64,
    /// Lifetime sum of completed withdrawals
    pub total_withdrawn: f64,
    /// Lifetime sum of contributions paid out of this wallet
    pub total_contributed: f64,
    /// Lifetime sum of payouts received
    pub total_received: f64,
    /// When the wallet was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Wallet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One wallet has many transactions
    #[sea_orm(has_many = "super::wallet_transaction::Entity")]
    Transactions,
    /// One wallet has many withdrawal requests
    #[sea_orm(has_many = "super::withdrawal_request::Entity")]
    WithdrawalRequests,
}

impl Related<super::wallet_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::withdrawal_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawalRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
