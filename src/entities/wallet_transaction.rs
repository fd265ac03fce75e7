//! `WalletTransaction` entity - The wallet's integrity anchor.
//!
//! Every balance change is a row pairing the delta with `balance_before` and
//! `balance_after`; for one wallet ordered by creation, `balance_after` of row
//! N must equal `balance_before` of row N+1.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of balance adjustment.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum WalletTransactionType {
    /// Funds added from outside the system
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Approved withdrawal leaving the wallet
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Contribution debit (recorded by the external payment side)
    #[sea_orm(string_value = "contribution")]
    Contribution,
    /// Payout credit from a settled payout
    #[sea_orm(string_value = "payout")]
    Payout,
    /// Administrative correction
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

/// Wallet transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Wallet this transaction belongs to
    pub wallet_id: i64,
    /// Kind of adjustment
    pub transaction_type: WalletTransactionType,
    /// Signed delta applied to the balance
    pub amount: f64,
    /// Wallet balance before this transaction
    pub balance_before: f64,
    /// Wallet balance after this transaction
    pub balance_after: f64,
    /// External or internal reference, e.g. a payout id
    pub reference: Option<String>,
    /// When the transaction was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `WalletTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
