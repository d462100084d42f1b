use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    Account, AccountRuleError, Amount, Clock, NewTransaction, RECENT_TRANSACTIONS_LIMIT,
    Transaction, TransactionType, normalize_amount, resolve_description,
};
use crate::storage::Repository;

use super::{AccountLedger, AppError};

/// Deposits, withdrawals and ledger queries.
#[derive(Clone)]
pub struct TransactionService {
    repo: Repository,
    clock: Arc<dyn Clock>,
    accounts: AccountLedger,
}

impl TransactionService {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>, accounts: AccountLedger) -> Self {
        Self {
            repo,
            clock,
            accounts,
        }
    }

    /// Credit `amount` to an ACTIVE account and record a DEPOSIT row.
    pub async fn deposit(
        &self,
        account_number: &str,
        amount: Amount,
        description: Option<String>,
    ) -> Result<Transaction, AppError> {
        self.apply(
            account_number,
            TransactionType::Deposit,
            amount,
            description,
            Account::balance_after_deposit,
        )
        .await
    }

    /// Debit `amount` from an ACTIVE account and record a WITHDRAWAL row.
    /// Withdrawing the whole balance is allowed.
    pub async fn withdraw(
        &self,
        account_number: &str,
        amount: Amount,
        description: Option<String>,
    ) -> Result<Transaction, AppError> {
        self.apply(
            account_number,
            TransactionType::Withdrawal,
            amount,
            description,
            Account::balance_after_withdrawal,
        )
        .await
    }

    /// Load, check, write the balance and append the ledger row in one unit
    /// of work. Any failure leaves both the balance and the ledger untouched.
    async fn apply(
        &self,
        account_number: &str,
        transaction_type: TransactionType,
        amount: Amount,
        description: Option<String>,
        rule: fn(&Account, Amount) -> Result<Amount, AccountRuleError>,
    ) -> Result<Transaction, AppError> {
        let amount = normalize_amount(amount)?;
        let description = resolve_description(transaction_type, description)?;

        let mut uow = self.repo.begin().await?;
        let account = AccountLedger::lock(&mut uow, account_number).await?;

        let new_balance = match rule(&account, amount) {
            Ok(balance) => balance,
            Err(violation) => {
                warn!(
                    account_number,
                    transaction_type = %transaction_type,
                    amount = %amount,
                    reason = %violation,
                    "transaction rejected"
                );
                return Err(AppError::from_rule(account_number, violation));
            }
        };

        let updated = self
            .accounts
            .update_balance(&mut uow, &account, new_balance)
            .await?;

        let transaction = uow
            .append_transaction(NewTransaction {
                account_number: updated.account_number.clone(),
                transaction_type,
                amount,
                balance_after: updated.balance,
                description: Some(description),
                created_at: self.clock.now(),
            })
            .await?;
        uow.commit().await?;

        info!(
            account_number,
            transaction_id = transaction.id,
            transaction_type = %transaction_type,
            amount = %amount,
            balance = %transaction.balance_after,
            "transaction recorded"
        );
        Ok(transaction)
    }

    /// Full ledger of an account, newest first.
    pub async fn get_transaction_history(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, AppError> {
        self.ensure_account(account_number).await?;
        Ok(self.repo.list_transactions(account_number, None).await?)
    }

    /// The most recent ledger rows of an account, newest first.
    pub async fn get_recent_transactions(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, AppError> {
        self.ensure_account(account_number).await?;
        Ok(self
            .repo
            .list_transactions(account_number, Some(RECENT_TRANSACTIONS_LIMIT))
            .await?)
    }

    pub async fn get_transactions_by_type(
        &self,
        account_number: &str,
        transaction_type: TransactionType,
    ) -> Result<Vec<Transaction>, AppError> {
        self.ensure_account(account_number).await?;
        Ok(self
            .repo
            .list_transactions_by_type(account_number, transaction_type)
            .await?)
    }

    pub async fn get_transaction_count(&self, account_number: &str) -> Result<u64, AppError> {
        self.ensure_account(account_number).await?;
        Ok(self.repo.count_transactions(account_number).await?)
    }

    async fn ensure_account(&self, account_number: &str) -> Result<(), AppError> {
        debug!(account_number, "querying ledger");
        if self.repo.account_exists(account_number).await? {
            Ok(())
        } else {
            Err(AppError::AccountNotFound(account_number.to_string()))
        }
    }
}
