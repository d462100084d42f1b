use std::path::Path;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::domain::{Clock, SystemClock};
use crate::storage::{Repository, StoreOptions};

use super::{AccountLedger, AppError, CustomerRegistry, SharedRng, TransactionService};

/// Entry point to the bank back office. This is the primary interface for
/// any client (CLI, HTTP façade, tests).
#[derive(Clone)]
pub struct BankService {
    repo: Repository,
    clock: Arc<dyn Clock>,
    customers: CustomerRegistry,
    accounts: AccountLedger,
    transactions: TransactionService,
}

impl BankService {
    /// Create a bank service on the given repository using wall-clock time.
    pub fn new(repo: Repository) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(repo, clock, Box::new(StdRng::from_entropy()))
    }

    /// Full control over time and the account number random source.
    pub fn with_parts(
        repo: Repository,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let rng: SharedRng = Arc::new(Mutex::new(rng));
        let customers = CustomerRegistry::new(repo.clone(), clock.clone());
        let accounts = AccountLedger::new(repo.clone(), clock.clone(), customers.clone(), rng);
        let transactions = TransactionService::new(repo.clone(), clock.clone(), accounts.clone());

        Self {
            repo,
            clock,
            customers,
            accounts,
            transactions,
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let repo = Repository::init(database_path, &StoreOptions::default()).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let repo = Repository::open(database_path, &StoreOptions::default(), false).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn customers(&self) -> &CustomerRegistry {
        &self.customers
    }

    pub fn accounts(&self) -> &AccountLedger {
        &self.accounts
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }
}
