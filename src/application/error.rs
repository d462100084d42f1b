use thiserror::Error;

use crate::domain::{
    AccountRuleError, AccountStatus, Amount, AmountError, CustomerId, CustomerValidationError,
    DescriptionTooLong,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Customer not found with ID: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Account is already closed: {0}")]
    AlreadyClosed(String),

    #[error("Cannot close account {account_number} with non-zero balance: {balance}")]
    NonZeroBalance {
        account_number: String,
        balance: Amount,
    },

    #[error("Account {account_number} is not active (status: {status})")]
    InactiveAccount {
        account_number: String,
        status: AccountStatus,
    },

    #[error("Insufficient funds in account {account_number}: available {balance}, requested {requested}")]
    InsufficientFunds {
        account_number: String,
        balance: Amount,
        requested: Amount,
    },

    #[error("Unable to generate a unique account number after {attempts} attempts")]
    Generation { attempts: u32 },

    #[error("Account {0} was modified concurrently, retry the operation")]
    ConcurrentUpdate(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Transport-independent status class of an error. Each class maps to a
/// distinct externally visible status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

impl ErrorCategory {
    /// The HTTP status a web façade should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Internal => 500,
        }
    }

    /// Process exit code used by the command line.
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorCategory::Internal => 1,
            ErrorCategory::Validation => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Conflict => 4,
        }
    }
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::CustomerNotFound(_) | AppError::AccountNotFound(_) => ErrorCategory::NotFound,
            AppError::Validation(_) => ErrorCategory::Validation,
            AppError::DuplicateEmail(_)
            | AppError::AlreadyClosed(_)
            | AppError::NonZeroBalance { .. }
            | AppError::InactiveAccount { .. }
            | AppError::InsufficientFunds { .. }
            | AppError::ConcurrentUpdate(_) => ErrorCategory::Conflict,
            AppError::Generation { .. } | AppError::Database(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Attach the account number to a balance or lifecycle rule violation.
    pub(crate) fn from_rule(account_number: &str, err: AccountRuleError) -> Self {
        let account_number = account_number.to_string();
        match err {
            AccountRuleError::Inactive(status) => AppError::InactiveAccount {
                account_number,
                status,
            },
            AccountRuleError::InsufficientFunds { balance, requested } => {
                AppError::InsufficientFunds {
                    account_number,
                    balance,
                    requested,
                }
            }
            AccountRuleError::BalanceLimitExceeded { .. } => AppError::Validation(err.to_string()),
            AccountRuleError::AlreadyClosed => AppError::AlreadyClosed(account_number),
            AccountRuleError::NonZeroBalance(balance) => AppError::NonZeroBalance {
                account_number,
                balance,
            },
        }
    }
}

impl From<CustomerValidationError> for AppError {
    fn from(err: CustomerValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<AmountError> for AppError {
    fn from(err: AmountError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<DescriptionTooLong> for AppError {
    fn from(err: DescriptionTooLong) -> Self {
        AppError::Validation(err.to_string())
    }
}
