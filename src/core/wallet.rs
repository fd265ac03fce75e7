//! Wallet ledger and two-phase withdrawals.
//!
//! Every balance change goes through [`adjust`], which writes one
//! `WalletTransaction` pairing `balance_before` with `balance_after` and moves
//! the wallet row to `balance_after` in the same database transaction. That
//! pairing is the integrity anchor: for any wallet the transaction sequence
//! must chain, `balance_after` of row N equalling `balance_before` of row N+1.
//!
//! Withdrawals are two-phase: a request reserves the amount in
//! `pending_balance`; approval debits the balance and releases the
//! reservation; rejection only releases it.

use chrono::Duration;
use sea_orm::{
    ActiveEnum, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};

use crate::{
    core::audit,
    entities::{
        Wallet, WalletModel, WalletTransaction, WalletTransactionModel, WalletTransactionType,
        WithdrawalRequest, WithdrawalRequestModel, WithdrawalStatus, wallet, wallet_transaction,
        withdrawal_request,
    },
    errors::{Error, Result},
    models::Actor,
};

/// Finds a user's wallet, creating a zeroed one if absent.
pub async fn get_or_create<C>(conn: &C, user_id: &str, now: DateTimeUtc) -> Result<WalletModel>
where
    C: ConnectionTrait,
{
    let existing = Wallet::find()
        .filter(wallet::Column::UserId.eq(user_id))
        .one(conn)
        .await?;
    if let Some(found) = existing {
        return Ok(found);
    }

    let model = wallet::ActiveModel {
        user_id: Set(user_id.to_string()),
        balance: Set(0.0),
        pending_balance: Set(0.0),
        total_deposited: Set(0.0),
        total_withdrawn: Set(0.0),
        total_contributed: Set(0.0),
        total_received: Set(0.0),
        created_at: Set(now),
        ..Default::default()
    };
    model.insert(conn).await.map_err(Into::into)
}

/// Applies a signed delta to a wallet, recording the paired before/after
/// transaction and updating the matching lifetime total.
///
/// Composes into the caller's database transaction; the wallet row read, the
/// transaction insert, and the balance write must not interleave with another
/// adjustment to the same wallet.
pub async fn adjust<C>(
    conn: &C,
    wallet_id: i64,
    delta: f64,
    transaction_type: WalletTransactionType,
    reference: Option<String>,
    now: DateTimeUtc,
) -> Result<WalletTransactionModel>
where
    C: ConnectionTrait,
{
    if delta == 0.0 || !delta.is_finite() {
        return Err(Error::InvalidAmount { amount: delta });
    }

    let target = Wallet::find_by_id(wallet_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::WalletNotFound {
            owner: format!("wallet {wallet_id}"),
        })?;

    let balance_before = target.balance;
    let balance_after = balance_before + delta;
    if balance_after < 0.0 {
        return Err(Error::InsufficientBalance {
            available: balance_before,
            requested: -delta,
        });
    }

    let record = wallet_transaction::ActiveModel {
        wallet_id: Set(wallet_id),
        transaction_type: Set(transaction_type.clone()),
        amount: Set(delta),
        balance_before: Set(balance_before),
        balance_after: Set(balance_after),
        reference: Set(reference),
        created_at: Set(now),
        ..Default::default()
    };
    let result = record.insert(conn).await?;

    let mut model: wallet::ActiveModel = target.clone().into();
    model.balance = Set(balance_after);
    match transaction_type {
        WalletTransactionType::Deposit => {
            model.total_deposited = Set(target.total_deposited + delta.abs());
        }
        WalletTransactionType::Withdrawal => {
            model.total_withdrawn = Set(target.total_withdrawn + delta.abs());
        }
        WalletTransactionType::Contribution => {
            model.total_contributed = Set(target.total_contributed + delta.abs());
        }
        WalletTransactionType::Payout => {
            model.total_received = Set(target.total_received + delta.abs());
        }
        WalletTransactionType::Adjustment => {}
    }
    model.update(conn).await?;

    Ok(result)
}

/// Deposits external funds into a user's wallet.
pub async fn deposit(
    db: &DatabaseConnection,
    user_id: &str,
    amount: f64,
    reference: Option<String>,
    now: DateTimeUtc,
) -> Result<WalletTransactionModel> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;
    let target = get_or_create(&txn, user_id, now).await?;
    let result = adjust(
        &txn,
        target.id,
        amount,
        WalletTransactionType::Deposit,
        reference,
        now,
    )
    .await?;
    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: user_id,
        action: "wallet.deposit",
        resource_type: "wallet",
        resource_id: target.id,
        details: format!("amount={amount}"),
    });
    Ok(result)
}

/// Reserves an amount for withdrawal without touching the spendable balance.
///
/// Fails `InsufficientBalance` when the unreserved balance cannot cover the
/// amount. The request expires after `expiry_days`; an expired request can
/// only be rejected.
pub async fn request_withdrawal(
    db: &DatabaseConnection,
    user_id: &str,
    amount: f64,
    expiry_days: i64,
    now: DateTimeUtc,
) -> Result<WithdrawalRequestModel> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let target = Wallet::find()
        .filter(wallet::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::WalletNotFound {
            owner: user_id.to_string(),
        })?;

    let available = target.balance - target.pending_balance;
    if available < amount {
        return Err(Error::InsufficientBalance {
            available,
            requested: amount,
        });
    }

    let request = withdrawal_request::ActiveModel {
        wallet_id: Set(target.id),
        amount: Set(amount),
        status: Set(WithdrawalStatus::Pending),
        requested_at: Set(now),
        expires_at: Set(now + Duration::days(expiry_days)),
        processed_at: Set(None),
        processed_by: Set(None),
        ..Default::default()
    };
    let result = request.insert(&txn).await?;

    let wallet_id = target.id;
    let reserved = target.pending_balance + amount;
    let mut model: wallet::ActiveModel = target.into();
    model.pending_balance = Set(reserved);
    model.update(&txn).await?;

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: user_id,
        action: "withdrawal.request",
        resource_type: "withdrawal_request",
        resource_id: result.id,
        details: format!("wallet_id={wallet_id} amount={amount}"),
    });
    Ok(result)
}

/// Loads a withdrawal request or fails with [`Error::WithdrawalNotFound`].
async fn get_request_or_fail<C>(conn: &C, request_id: i64) -> Result<WithdrawalRequestModel>
where
    C: ConnectionTrait,
{
    WithdrawalRequest::find_by_id(request_id)
        .one(conn)
        .await?
        .ok_or(Error::WithdrawalNotFound { id: request_id })
}

/// Commits a pending withdrawal: debits the balance and releases the
/// reservation. The balance is re-checked here because concurrent requests
/// can exhaust it between request and approval. Admin only.
pub async fn approve_withdrawal(
    db: &DatabaseConnection,
    actor: &Actor,
    request_id: i64,
    now: DateTimeUtc,
) -> Result<WithdrawalRequestModel> {
    actor.require_admin("approve withdrawal")?;

    let txn = db.begin().await?;

    let request = get_request_or_fail(&txn, request_id).await?;
    if request.status != WithdrawalStatus::Pending {
        return Err(Error::AlreadyProcessed {
            entity: "withdrawal request",
            id: request.id,
            status: request.status.to_value(),
        });
    }
    if now > request.expires_at {
        return Err(Error::ExpiredWindow {
            id: request.id,
            expired_at: request.expires_at,
        });
    }

    let target = Wallet::find_by_id(request.wallet_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::WalletNotFound {
            owner: format!("wallet {}", request.wallet_id),
        })?;
    if target.balance < request.amount {
        return Err(Error::InsufficientBalance {
            available: target.balance,
            requested: request.amount,
        });
    }

    adjust(
        &txn,
        target.id,
        -request.amount,
        WalletTransactionType::Withdrawal,
        Some(format!("withdrawal:{}", request.id)),
        now,
    )
    .await?;

    // Release the reservation taken at request time
    release_reservation(&txn, target.id, request.amount).await?;

    let mut model: withdrawal_request::ActiveModel = request.into();
    model.status = Set(WithdrawalStatus::Approved);
    model.processed_at = Set(Some(now));
    model.processed_by = Set(Some(actor.user_id.clone()));
    let result = model.update(&txn).await?;

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "withdrawal.approve",
        resource_type: "withdrawal_request",
        resource_id: request_id,
        details: format!("amount={}", result.amount),
    });
    Ok(result)
}

/// Rejects a pending withdrawal, releasing the reservation without a debit.
/// Admin only.
pub async fn reject_withdrawal(
    db: &DatabaseConnection,
    actor: &Actor,
    request_id: i64,
    now: DateTimeUtc,
) -> Result<WithdrawalRequestModel> {
    actor.require_admin("reject withdrawal")?;

    let txn = db.begin().await?;

    let request = get_request_or_fail(&txn, request_id).await?;
    if request.status != WithdrawalStatus::Pending {
        return Err(Error::AlreadyProcessed {
            entity: "withdrawal request",
            id: request.id,
            status: request.status.to_value(),
        });
    }

    release_reservation(&txn, request.wallet_id, request.amount).await?;

    let mut model: withdrawal_request::ActiveModel = request.into();
    model.status = Set(WithdrawalStatus::Rejected);
    model.processed_at = Set(Some(now));
    model.processed_by = Set(Some(actor.user_id.clone()));
    let result = model.update(&txn).await?;

    txn.commit().await?;

    audit::record(&audit::AuditEntry {
        actor: &actor.user_id,
        action: "withdrawal.reject",
        resource_type: "withdrawal_request",
        resource_id: request_id,
        details: String::new(),
    });
    Ok(result)
}

/// Atomically lowers a wallet's `pending_balance`.
async fn release_reservation<C>(conn: &C, wallet_id: i64, amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    Wallet::update_many()
        .col_expr(
            wallet::Column::PendingBalance,
            Expr::col(wallet::Column::PendingBalance).sub(amount),
        )
        .filter(wallet::Column::Id.eq(wallet_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// All transactions for a wallet in creation order. The sequence must chain:
/// each row's `balance_after` equals the next row's `balance_before`.
pub async fn transactions_for_wallet(
    db: &DatabaseConnection,
    wallet_id: i64,
) -> Result<Vec<WalletTransactionModel>> {
    WalletTransaction::find()
        .filter(wallet_transaction::Column::WalletId.eq(wallet_id))
        .order_by_asc(wallet_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{admin, now_at, setup_test_db};

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);

        let first = get_or_create(&db, "alice", now).await?;
        let second = get_or_create(&db, "alice", now).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(first.balance, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_transaction_sequence_chains() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);

        deposit(&db, "alice", 100.0, None, now).await?;
        deposit(&db, "alice", 40.0, None, now).await?;
        let target = get_or_create(&db, "alice", now).await?;
        adjust(
            &db,
            target.id,
            -30.0,
            WalletTransactionType::Adjustment,
            None,
            now,
        )
        .await?;

        let records = transactions_for_wallet(&db, target.id).await?;
        assert_eq!(records.len(), 3);
        for pair in records.windows(2) {
            assert_eq!(pair[0].balance_after, pair[1].balance_before);
        }
        assert_eq!(records[2].balance_after, 110.0);

        let target = get_or_create(&db, "alice", now).await?;
        assert_eq!(target.balance, 110.0);
        assert_eq!(target.total_deposited, 140.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_rejects_overdraft_and_bad_amounts() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);
        let target = get_or_create(&db, "alice", now).await?;

        let result = adjust(
            &db,
            target.id,
            -10.0,
            WalletTransactionType::Withdrawal,
            None,
            now,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientBalance {
                available: 0.0,
                requested: 10.0
            }
        ));

        let result = adjust(&db, target.id, 0.0, WalletTransactionType::Deposit, None, now).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: 0.0 }));

        let result = adjust(
            &db,
            target.id,
            f64::NAN,
            WalletTransactionType::Deposit,
            None,
            now,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_withdrawal_two_phase_approve() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);
        deposit(&db, "alice", 100.0, None, now).await?;

        let request = request_withdrawal(&db, "alice", 60.0, 7, now).await?;
        let target = get_or_create(&db, "alice", now).await?;
        // Reservation holds the amount without debiting
        assert_eq!(target.balance, 100.0);
        assert_eq!(target.pending_balance, 60.0);

        approve_withdrawal(&db, &admin(), request.id, now).await?;
        let target = get_or_create(&db, "alice", now).await?;
        assert_eq!(target.balance, 40.0);
        assert_eq!(target.pending_balance, 0.0);
        assert_eq!(target.total_withdrawn, 60.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_withdrawal_reject_releases_without_debit() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);
        deposit(&db, "alice", 100.0, None, now).await?;

        let request = request_withdrawal(&db, "alice", 60.0, 7, now).await?;
        reject_withdrawal(&db, &admin(), request.id, now).await?;

        let target = get_or_create(&db, "alice", now).await?;
        assert_eq!(target.balance, 100.0);
        assert_eq!(target.pending_balance, 0.0);
        assert_eq!(target.total_withdrawn, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_reservations_limit_further_requests() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);
        deposit(&db, "alice", 100.0, None, now).await?;

        request_withdrawal(&db, "alice", 80.0, 7, now).await?;
        let result = request_withdrawal(&db, "alice", 30.0, 7, now).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientBalance {
                available: 20.0,
                requested: 30.0
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_expired_request_cannot_be_approved() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);
        deposit(&db, "alice", 100.0, None, now).await?;

        let request = request_withdrawal(&db, "alice", 60.0, 7, now).await?;
        let later = now_at(2026, 1, 9, 0);
        let result = approve_withdrawal(&db, &admin(), request.id, later).await;
        assert!(matches!(result.unwrap_err(), Error::ExpiredWindow { .. }));

        // Rejection still works to release the stale reservation
        reject_withdrawal(&db, &admin(), request.id, later).await?;
        let target = get_or_create(&db, "alice", now).await?;
        assert_eq!(target.pending_balance, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_double_processing_is_detected() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);
        deposit(&db, "alice", 100.0, None, now).await?;

        let request = request_withdrawal(&db, "alice", 60.0, 7, now).await?;
        approve_withdrawal(&db, &admin(), request.id, now).await?;

        let result = approve_withdrawal(&db, &admin(), request.id, now).await;
        assert!(matches!(result.unwrap_err(), Error::AlreadyProcessed { .. }));
        let result = reject_withdrawal(&db, &admin(), request.id, now).await;
        assert!(matches!(result.unwrap_err(), Error::AlreadyProcessed { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_balance_rechecked_at_approval() -> Result<()> {
        let db = setup_test_db().await?;
        let now = now_at(2026, 1, 1, 0);
        deposit(&db, "alice", 100.0, None, now).await?;

        let request = request_withdrawal(&db, "alice", 60.0, 7, now).await?;

        // Balance drains between request and approval
        let target = get_or_create(&db, "alice", now).await?;
        adjust(
            &db,
            target.id,
            -70.0,
            WalletTransactionType::Adjustment,
            None,
            now,
        )
        .await?;

        let result = approve_withdrawal(&db, &admin(), request.id, now).await;
        assert!(matches!(result.unwrap_err(), Error::InsufficientBalance { .. }));

        Ok(())
    }
}
