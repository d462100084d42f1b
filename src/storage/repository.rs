use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::{
    Account, AccountStatus, AccountType, Customer, CustomerId, NewCustomer, Transaction,
    TransactionType,
};

use super::{MIGRATION_001_INITIAL, StoreOptions, UnitOfWork, format_timestamp, parse_timestamp};

pub(crate) const CUSTOMER_COLUMNS: &str = "id, name, email, phone, created_at, updated_at";
pub(crate) const ACCOUNT_COLUMNS: &str =
    "account_number, customer_id, account_type, balance, status, version, created_at, updated_at";
pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, account_number, transaction_type, amount, balance_after, description, created_at";

/// Repository for persisting and querying customers, accounts and ledger rows.
///
/// Reads go straight to the pool. Anything that mutates an account goes
/// through a [`UnitOfWork`] obtained from [`Repository::begin`].
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the SQLite database file at `path`.
    /// With `create` set, a missing file is created instead of failing.
    pub async fn open(path: impl AsRef<Path>, options: &StoreOptions, create: bool) -> Result<Self> {
        let connect_options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("Failed to open database {}", path.as_ref().display()))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database file (create if missing + migrate).
    pub async fn init(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let repo = Self::open(path, options, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Start an atomic unit of work.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(UnitOfWork::new(tx))
    }

    // ========================
    // Customer operations
    // ========================

    /// Insert a customer and return it with its generated id.
    pub async fn save_customer(
        &self,
        customer: &NewCustomer,
        now: DateTime<Utc>,
    ) -> Result<Customer> {
        let stamp = format_timestamp(now);
        let row = sqlx::query(
            r#"
            INSERT INTO customers (name, email, phone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&stamp)
        .bind(&stamp)
        .fetch_one(&self.pool)
        .await
        .context("Failed to save customer")?;

        Ok(Customer {
            id: row.get("id"),
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let query = format!("SELECT {} FROM customers WHERE id = ?", CUSTOMER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    pub async fn customer_exists(&self, id: CustomerId) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?) as found")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check customer")?;
        Ok(row.get::<i64, _>("found") != 0)
    }

    /// Emails are stored lower-cased, so `email` must be too.
    pub async fn customer_email_exists(&self, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM customers WHERE email = ?) as found")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check customer email")?;
        Ok(row.get::<i64, _>("found") != 0)
    }

    /// List all customers in insertion order.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let query = format!("SELECT {} FROM customers ORDER BY id", CUSTOMER_COLUMNS);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Case-insensitive substring match on the customer name.
    pub async fn search_customers_by_name(&self, term: &str) -> Result<Vec<Customer>> {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        let query = format!(
            "SELECT {} FROM customers WHERE lower(name) LIKE ? ESCAPE '\\' ORDER BY id",
            CUSTOMER_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .context("Failed to search customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    pub async fn count_customers(&self) -> Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) as count FROM customers")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count customers")?
            .get("count");
        Ok(count as u64)
    }

    pub(crate) fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Customer {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at timestamp")?,
        })
    }

    // ========================
    // Account operations
    // ========================

    /// Get an account by its number.
    pub async fn get_account(&self, account_number: &str) -> Result<Option<Account>> {
        let query = format!(
            "SELECT {} FROM accounts WHERE account_number = ?",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(account_number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn account_exists(&self, account_number: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE account_number = ?) as found",
        )
        .bind(account_number)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check account")?;
        Ok(row.get::<i64, _>("found") != 0)
    }

    /// All accounts of a customer, oldest first.
    pub async fn list_accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        let query = format!(
            "SELECT {} FROM accounts WHERE customer_id = ? ORDER BY created_at, account_number",
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts for customer")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn list_active_accounts_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>> {
        let query = format!(
            "SELECT {} FROM accounts WHERE customer_id = ? AND status = ? ORDER BY created_at, account_number",
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(customer_id)
            .bind(AccountStatus::Active.as_str())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list active accounts for customer")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn list_accounts_by_status(&self, status: AccountStatus) -> Result<Vec<Account>> {
        let query = format!(
            "SELECT {} FROM accounts WHERE status = ? ORDER BY created_at, account_number",
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts by status")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub(crate) fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let account_type_str: String = row.get("account_type");
        let status_str: String = row.get("status");
        let balance_str: String = row.get("balance");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Account {
            account_number: row.get("account_number"),
            customer_id: row.get("customer_id"),
            account_type: AccountType::from_str(&account_type_str)
                .with_context(|| format!("Invalid account type: {}", account_type_str))?,
            balance: parse_decimal(&balance_str).context("Invalid balance")?,
            status: AccountStatus::from_str(&status_str)
                .with_context(|| format!("Invalid account status: {}", status_str))?,
            version: row.get("version"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at timestamp")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Ledger rows of an account, newest first.
    pub async fn list_transactions(
        &self,
        account_number: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let mut query = format!(
            "SELECT {} FROM transactions WHERE account_number = ? ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        );
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .bind(account_number)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Ledger rows of one type for an account, newest first.
    pub async fn list_transactions_by_type(
        &self,
        account_number: &str,
        transaction_type: TransactionType,
    ) -> Result<Vec<Transaction>> {
        let query = format!(
            "SELECT {} FROM transactions WHERE account_number = ? AND transaction_type = ? ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(account_number)
            .bind(transaction_type.as_str())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions by type")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    pub async fn count_transactions(&self, account_number: &str) -> Result<u64> {
        let count: i64 =
            sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE account_number = ?")
                .bind(account_number)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count transactions")?
                .get("count");
        Ok(count as u64)
    }

    pub(crate) fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let type_str: String = row.get("transaction_type");
        let amount_str: String = row.get("amount");
        let balance_after_str: String = row.get("balance_after");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: row.get("id"),
            account_number: row.get("account_number"),
            transaction_type: TransactionType::from_str(&type_str)
                .with_context(|| format!("Invalid transaction type: {}", type_str))?,
            amount: parse_decimal(&amount_str).context("Invalid amount")?,
            balance_after: parse_decimal(&balance_after_str).context("Invalid balance_after")?,
            description: row.get("description"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Ok(Decimal::from_str(value)?)
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
