//! `WithdrawalRequest` entity - Two-phase withdrawal against a wallet.
//!
//! Creation reserves the amount into the wallet's `pending_balance`; approval
//! debits the balance and releases the reservation; rejection only releases
//! the reservation. Requests expire after a configured window.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a withdrawal request.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum WithdrawalStatus {
    /// Reservation held, awaiting administrator review
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Balance debited and reservation released; terminal
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Reservation released without debit; terminal
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Withdrawal request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawal_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Wallet the withdrawal draws from
    pub wallet_id: i64,
    /// Amount requested; reserved in `pending_balance` while pending
    pub amount: f64,
    /// Current status
    pub status: WithdrawalStatus,
    /// When the request was made
    pub requested_at: DateTimeUtc,
    /// When the request stops being approvable
    pub expires_at: DateTimeUtc,
    /// When the request was approved or rejected
    pub processed_at: Option<DateTimeUtc>,
    /// Administrator who processed the request
    pub processed_by: Option<String>,
}

/// Defines relationships between `WithdrawalRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to one wallet
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
