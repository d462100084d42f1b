use std::sync::{Arc, Mutex};

use rand::{Rng, RngCore};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::{
    Account, AccountNumber, AccountRuleError, AccountStatus, AccountType, Clock, CustomerId,
    MAX_ACCOUNT_NUMBER_ATTEMPTS, account_number_candidate,
};
use crate::storage::{Repository, UnitOfWork};

use super::{AppError, CustomerRegistry};

/// Shared random source for account number suffixes.
pub type SharedRng = Arc<Mutex<Box<dyn RngCore + Send>>>;

/// Account details together with the holder's name.
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub account: Account,
    pub customer_name: String,
}

/// Account lifecycle and the single writer of account balances.
#[derive(Clone)]
pub struct AccountLedger {
    repo: Repository,
    clock: Arc<dyn Clock>,
    customers: CustomerRegistry,
    rng: SharedRng,
}

impl AccountLedger {
    pub fn new(
        repo: Repository,
        clock: Arc<dyn Clock>,
        customers: CustomerRegistry,
        rng: SharedRng,
    ) -> Self {
        Self {
            repo,
            clock,
            customers,
            rng,
        }
    }

    /// Open a new ACTIVE account with a zero balance for an existing customer.
    pub async fn create_account(
        &self,
        customer_id: CustomerId,
        account_type: AccountType,
    ) -> Result<Account, AppError> {
        if !self.customers.customer_exists(customer_id).await? {
            return Err(AppError::CustomerNotFound(customer_id));
        }

        let mut uow = self.repo.begin().await?;
        uow.lock_for_write().await?;
        let account_number = self.generate_account_number(&mut uow).await?;

        let account = Account::open(account_number, customer_id, account_type, self.clock.now());
        uow.insert_account(&account).await?;
        uow.commit().await?;

        info!(
            account_number = %account.account_number,
            customer_id,
            account_type = %account_type,
            "account opened"
        );
        Ok(account)
    }

    /// Draw candidates until one is unused, giving up after
    /// [`MAX_ACCOUNT_NUMBER_ATTEMPTS`].
    async fn generate_account_number(
        &self,
        uow: &mut UnitOfWork,
    ) -> Result<AccountNumber, AppError> {
        for attempt in 1..=MAX_ACCOUNT_NUMBER_ATTEMPTS {
            let candidate = account_number_candidate(self.clock.now(), self.next_suffix());
            if !uow.account_exists(&candidate).await? {
                debug!(account_number = %candidate, attempt, "generated account number");
                return Ok(candidate);
            }
            debug!(account_number = %candidate, attempt, "account number collision");
        }

        error!(
            attempts = MAX_ACCOUNT_NUMBER_ATTEMPTS,
            "account number generation exhausted"
        );
        Err(AppError::Generation {
            attempts: MAX_ACCOUNT_NUMBER_ATTEMPTS,
        })
    }

    fn next_suffix(&self) -> u16 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..1000)
    }

    pub async fn find_by_account_number(&self, account_number: &str) -> Result<Account, AppError> {
        debug!(account_number, "looking up account");
        self.repo
            .get_account(account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))
    }

    pub async fn get_account_info(&self, account_number: &str) -> Result<AccountInfo, AppError> {
        let account = self.find_by_account_number(account_number).await?;
        let customer = self.customers.find_customer_by_id(account.customer_id).await?;
        Ok(AccountInfo {
            account,
            customer_name: customer.name,
        })
    }

    /// Move an account to CLOSED. Only a zero balance may be closed.
    pub async fn close_account(&self, account_number: &str) -> Result<Account, AppError> {
        let mut uow = self.repo.begin().await?;
        let account = Self::lock(&mut uow, account_number).await?;

        if let Err(rule) = account.ensure_closable() {
            warn!(account_number, reason = %rule, "account close rejected");
            return Err(AppError::from_rule(account_number, rule));
        }

        let closed = uow
            .write_account(&account, account.balance, AccountStatus::Closed, self.clock.now())
            .await?
            .ok_or_else(|| AppError::ConcurrentUpdate(account_number.to_string()))?;
        uow.commit().await?;

        info!(account_number, "account closed");
        Ok(closed)
    }

    /// Load an account inside a unit of work, holding the write lock.
    pub(crate) async fn lock(
        uow: &mut UnitOfWork,
        account_number: &str,
    ) -> Result<Account, AppError> {
        uow.lock_account(account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))
    }

    /// Persist a new balance for `account`. Every balance change goes
    /// through here.
    pub(crate) async fn update_balance(
        &self,
        uow: &mut UnitOfWork,
        account: &Account,
        new_balance: Decimal,
    ) -> Result<Account, AppError> {
        account
            .ensure_active()
            .map_err(|rule| AppError::from_rule(&account.account_number, rule))?;

        if new_balance < Decimal::ZERO {
            return Err(AppError::from_rule(
                &account.account_number,
                AccountRuleError::InsufficientFunds {
                    balance: account.balance,
                    requested: account.balance - new_balance,
                },
            ));
        }

        let updated = uow
            .write_account(account, new_balance, account.status, self.clock.now())
            .await?
            .ok_or_else(|| AppError::ConcurrentUpdate(account.account_number.clone()))?;

        debug!(
            account_number = %updated.account_number,
            balance = %updated.balance,
            "balance updated"
        );
        Ok(updated)
    }

    /// Every account of a customer. Fails when the customer does not exist.
    pub async fn find_accounts_by_customer_id(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, AppError> {
        if !self.customers.customer_exists(customer_id).await? {
            return Err(AppError::CustomerNotFound(customer_id));
        }
        Ok(self.repo.list_accounts_by_customer(customer_id).await?)
    }

    /// ACTIVE accounts of a customer. An unknown customer simply has none.
    pub async fn find_active_accounts_by_customer_id(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_active_accounts_by_customer(customer_id).await?)
    }

    pub async fn find_accounts_by_status(
        &self,
        status: AccountStatus,
    ) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts_by_status(status).await?)
    }
}
