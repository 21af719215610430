//! Wallet ledger — atomic balance deltas paired with immutable transaction rows.
//!
//! Every balance mutation and its transaction record happen inside one
//! database transaction with the wallet row locked `FOR UPDATE`, so
//! concurrent debits against the same wallet serialize and can never both
//! pass the sufficiency check on a stale balance. The `*_tx` variants let
//! the room state machine fold money movement into its own atomic unit
//! (deposit + participant insert, prize payout + completion, refunds).

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use crate::db::models::DbTransaction;
use crate::db::queries;
use crate::error::{AppError, Result};

/// Ledger transaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    TopUp,
    Deposit,
    Withdrawal,
    Prize,
    Tip,
    Refund,
    PlatformFee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TopUp => "top_up",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Prize => "prize",
            TransactionType::Tip => "tip",
            TransactionType::Refund => "refund",
            TransactionType::PlatformFee => "platform_fee",
        }
    }
}

/// Ledger transaction states. Only `completed` rows count toward the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Completed,
    Pending,
    Reversed,
    Flagged,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Reversed => "reversed",
            TransactionStatus::Flagged => "flagged",
        }
    }
}

/// Validate a credit amount before touching any state.
pub fn check_credit(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidAmount(format!(
            "credit amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Validate a debit against the locked wallet state. Frozen wallets reject
/// all debits before the sufficiency check.
pub fn check_debit(balance: Decimal, is_frozen: bool, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidAmount(format!(
            "debit amount must be positive, got {amount}"
        )));
    }
    if is_frozen {
        return Err(AppError::WalletFrozen);
    }
    if balance < amount {
        return Err(AppError::InsufficientFunds);
    }
    Ok(())
}

/// The wallet balance + append-only transaction log subsystem.
pub struct Ledger {
    db: PgPool,
}

impl Ledger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Credit a wallet, creating it on first use.
    pub async fn credit(
        &self,
        user_id: i64,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        room_id: Option<i64>,
    ) -> Result<DbTransaction> {
        let mut tx = self.db.begin().await?;
        let record = Self::credit_tx(&mut tx, user_id, amount, tx_type, description, room_id).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Debit a wallet.
    pub async fn debit(
        &self,
        user_id: i64,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        room_id: Option<i64>,
    ) -> Result<DbTransaction> {
        let mut tx = self.db.begin().await?;
        let record = Self::debit_tx(&mut tx, user_id, amount, tx_type, description, room_id).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Credit inside an existing transaction.
    pub async fn credit_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        room_id: Option<i64>,
    ) -> Result<DbTransaction> {
        check_credit(amount)?;
        queries::ensure_wallet(tx, user_id).await?;
        let wallet = queries::lock_wallet(tx, user_id)
            .await?
            .ok_or(AppError::WalletNotFound)?;
        queries::update_wallet_balance(tx, wallet.id, wallet.balance + amount).await?;
        let record = queries::insert_transaction(
            tx,
            wallet.id,
            tx_type.as_str(),
            amount,
            description,
            room_id,
            TransactionStatus::Completed.as_str(),
        )
        .await?;
        info!(
            user_id,
            tx_type = tx_type.as_str(),
            %amount,
            transaction_id = record.id,
            "wallet credited"
        );
        Ok(record)
    }

    /// Debit inside an existing transaction. Fails without writes if the
    /// wallet is missing, frozen, or short.
    pub async fn debit_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        room_id: Option<i64>,
    ) -> Result<DbTransaction> {
        let wallet = queries::lock_wallet(tx, user_id)
            .await?
            .ok_or(AppError::WalletNotFound)?;
        check_debit(wallet.balance, wallet.is_frozen, amount)?;
        queries::update_wallet_balance(tx, wallet.id, wallet.balance - amount).await?;
        let record = queries::insert_transaction(
            tx,
            wallet.id,
            tx_type.as_str(),
            -amount,
            description,
            room_id,
            TransactionStatus::Completed.as_str(),
        )
        .await?;
        info!(
            user_id,
            tx_type = tx_type.as_str(),
            %amount,
            transaction_id = record.id,
            "wallet debited"
        );
        Ok(record)
    }

    /// Reverse a completed transaction: apply the inverse delta to the
    /// wallet's *current* balance and mark the row `reversed`. The original
    /// row stays in the log.
    pub async fn reverse(&self, transaction_id: i64) -> Result<DbTransaction> {
        let mut tx = self.db.begin().await?;

        let record = queries::lock_transaction(&mut tx, transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;
        if record.status == TransactionStatus::Reversed.as_str() {
            return Err(AppError::AlreadyReversed);
        }

        // Lock the wallet row before reading the balance we compensate against
        let wallet = sqlx::query_as::<_, crate::db::models::DbWallet>(
            "SELECT * FROM wallets WHERE id = $1 FOR UPDATE",
        )
        .bind(record.wallet_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::WalletNotFound)?;

        queries::update_wallet_balance(&mut tx, wallet.id, wallet.balance - record.amount).await?;
        queries::mark_transaction_reversed(&mut tx, transaction_id).await?;

        tx.commit().await?;
        info!(transaction_id, wallet_id = wallet.id, "transaction reversed");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn debit_rejects_insufficient_balance() {
        let err = check_debit(dec("5"), false, dec("10")).unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds));
    }

    #[test]
    fn debit_rejects_frozen_wallet_before_balance_check() {
        // Frozen wins even when the balance would cover the debit
        let err = check_debit(dec("100"), true, dec("10")).unwrap_err();
        assert!(matches!(err, AppError::WalletFrozen));
    }

    #[test]
    fn exact_balance_debit_is_allowed() {
        assert!(check_debit(dec("10"), false, dec("10")).is_ok());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(matches!(
            check_debit(dec("10"), false, Decimal::ZERO).unwrap_err(),
            AppError::InvalidAmount(_)
        ));
        assert!(matches!(
            check_credit(dec("-1")).unwrap_err(),
            AppError::InvalidAmount(_)
        ));
    }

    #[test]
    fn transaction_type_strings_are_stable() {
        assert_eq!(TransactionType::TopUp.as_str(), "top_up");
        assert_eq!(TransactionType::Prize.as_str(), "prize");
        assert_eq!(TransactionType::PlatformFee.as_str(), "platform_fee");
    }
}
