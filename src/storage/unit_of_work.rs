use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, Sqlite};

use crate::domain::{Account, AccountStatus, NewTransaction, Transaction};

use super::repository::{ACCOUNT_COLUMNS, Repository};
use super::{format_timestamp, normalize_stored_amount};

/// One atomic read-check-write sequence against the store.
///
/// Wraps a SQLite transaction. Nothing written through it becomes visible
/// until [`UnitOfWork::commit`]; dropping it without committing rolls back.
pub struct UnitOfWork {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    /// Take the database write lock before anything else is read.
    ///
    /// A unit of work that reads first and writes later may find its snapshot
    /// outdated by a concurrent writer and fail; one that holds the lock from
    /// the start waits for the other writer and then proceeds.
    pub async fn lock_for_write(&mut self) -> Result<()> {
        // Matches no row, only the lock matters
        sqlx::query("UPDATE accounts SET version = version WHERE account_number = ''")
            .execute(&mut *self.tx)
            .await
            .context("Failed to lock store for writing")?;
        Ok(())
    }

    pub async fn account_exists(&mut self, account_number: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE account_number = ?) as found",
        )
        .bind(account_number)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to check account")?;
        Ok(row.get::<i64, _>("found") != 0)
    }

    /// Load an account and take the database write lock before reading it.
    ///
    /// The no-op update makes this unit of work the single writer, so a
    /// concurrent unit of work on the same store waits here and then reads
    /// the committed result instead of a stale balance.
    pub async fn lock_account(&mut self, account_number: &str) -> Result<Option<Account>> {
        sqlx::query("UPDATE accounts SET version = version WHERE account_number = ?")
            .bind(account_number)
            .execute(&mut *self.tx)
            .await
            .context("Failed to lock account")?;

        let query = format!(
            "SELECT {} FROM accounts WHERE account_number = ?",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(account_number)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch account")?;

        row.as_ref().map(Repository::row_to_account).transpose()
    }

    /// Insert a newly opened account.
    pub async fn insert_account(&mut self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_number, customer_id, account_type, balance, status, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.account_number)
        .bind(account.customer_id)
        .bind(account.account_type.as_str())
        .bind(normalize_stored_amount(account.balance))
        .bind(account.status.as_str())
        .bind(account.version)
        .bind(format_timestamp(account.created_at))
        .bind(format_timestamp(account.updated_at))
        .execute(&mut *self.tx)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Write balance and status of an account, guarded by its version.
    ///
    /// Returns the stored account with the bumped version, or `None` when the
    /// row changed since `account` was read.
    pub async fn write_account(
        &mut self,
        account: &Account,
        balance: Decimal,
        status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = ?, status = ?, version = version + 1, updated_at = ?
            WHERE account_number = ? AND version = ?
            "#,
        )
        .bind(normalize_stored_amount(balance))
        .bind(status.as_str())
        .bind(format_timestamp(now))
        .bind(&account.account_number)
        .bind(account.version)
        .execute(&mut *self.tx)
        .await
        .context("Failed to update account")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(Account {
            balance,
            status,
            version: account.version + 1,
            updated_at: now,
            ..account.clone()
        }))
    }

    /// Append a ledger row and return it with its generated id.
    pub async fn append_transaction(&mut self, entry: NewTransaction) -> Result<Transaction> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_number, transaction_type, amount, balance_after, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.account_number)
        .bind(entry.transaction_type.as_str())
        .bind(normalize_stored_amount(entry.amount))
        .bind(normalize_stored_amount(entry.balance_after))
        .bind(&entry.description)
        .bind(format_timestamp(entry.created_at))
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to append transaction")?;

        Ok(entry.into_transaction(row.get("id")))
    }

    /// Make every write of this unit of work durable at once.
    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit transaction")
    }
}
