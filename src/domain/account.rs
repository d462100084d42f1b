use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Amount, CustomerId, max_balance, normalize_balance};

pub type AccountNumber = String;

pub const ACCOUNT_NUMBER_PREFIX: &str = "ACC";

/// How many candidates are tried before account number generation gives up.
pub const MAX_ACCOUNT_NUMBER_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Checking,
    Current,
    FixedDeposit,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Savings,
        AccountType::Checking,
        AccountType::Current,
        AccountType::FixedDeposit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "SAVINGS",
            AccountType::Checking => "CHECKING",
            AccountType::Current => "CURRENT",
            AccountType::FixedDeposit => "FIXED_DEPOSIT",
        }
    }
}

impl FromStr for AccountType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_variant(s).as_str() {
            "SAVINGS" => Ok(AccountType::Savings),
            "CHECKING" => Ok(AccountType::Checking),
            "CURRENT" => Ok(AccountType::Current),
            "FIXED_DEPOSIT" => Ok(AccountType::FixedDeposit),
            _ => Err(UnknownVariant::new("account type", s)),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle: ACTIVE --close--> CLOSED. CLOSED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_variant(s).as_str() {
            "ACTIVE" => Ok(AccountStatus::Active),
            "CLOSED" => Ok(AccountStatus::Closed),
            _ => Err(UnknownVariant::new("account status", s)),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accepts `fixed-deposit`, `Fixed Deposit` and `FIXED_DEPOSIT` alike.
pub(crate) fn normalize_variant(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: AccountNumber,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub balance: Amount,
    pub status: AccountStatus,
    /// Optimistic-lock counter, bumped by the store on every write.
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A freshly opened account: zero balance, explicitly ACTIVE.
    pub fn open(
        account_number: AccountNumber,
        customer_id: CustomerId,
        account_type: AccountType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_number,
            customer_id,
            account_type,
            balance: normalize_balance(Decimal::ZERO),
            status: AccountStatus::Active,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn ensure_active(&self) -> Result<(), AccountRuleError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(AccountRuleError::Inactive(self.status))
        }
    }

    /// Balance after depositing `amount`. `amount` must already be normalized.
    pub fn balance_after_deposit(&self, amount: Amount) -> Result<Amount, AccountRuleError> {
        self.ensure_active()?;
        let new_balance = self
            .balance
            .checked_add(amount)
            .filter(|b| *b <= max_balance())
            .ok_or(AccountRuleError::BalanceLimitExceeded {
                balance: self.balance,
                requested: amount,
            })?;
        Ok(normalize_balance(new_balance))
    }

    /// Balance after withdrawing `amount`. Withdrawing the exact balance is
    /// allowed and leaves the account at zero.
    pub fn balance_after_withdrawal(&self, amount: Amount) -> Result<Amount, AccountRuleError> {
        self.ensure_active()?;
        if amount > self.balance {
            return Err(AccountRuleError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        Ok(normalize_balance(self.balance - amount))
    }

    /// Checks that the account may move to CLOSED.
    pub fn ensure_closable(&self) -> Result<(), AccountRuleError> {
        if self.status == AccountStatus::Closed {
            return Err(AccountRuleError::AlreadyClosed);
        }
        // Negative balances cannot happen through deposit/withdraw, but are
        // refused all the same.
        if !self.balance.is_zero() {
            return Err(AccountRuleError::NonZeroBalance(self.balance));
        }
        Ok(())
    }
}

/// Build an account number candidate: `ACC` + epoch millis + 3-digit suffix.
pub fn account_number_candidate(now: DateTime<Utc>, suffix: u16) -> AccountNumber {
    format!(
        "{}{}{:03}",
        ACCOUNT_NUMBER_PREFIX,
        now.timestamp_millis(),
        suffix % 1000
    )
}

/// Shape check for account numbers produced by [`account_number_candidate`].
pub fn is_account_number(value: &str) -> bool {
    value
        .strip_prefix(ACCOUNT_NUMBER_PREFIX)
        .is_some_and(|digits| digits.len() > 3 && digits.chars().all(|c| c.is_ascii_digit()))
}

/// Violations of the account balance and lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRuleError {
    Inactive(AccountStatus),
    InsufficientFunds { balance: Amount, requested: Amount },
    BalanceLimitExceeded { balance: Amount, requested: Amount },
    AlreadyClosed,
    NonZeroBalance(Amount),
}

impl fmt::Display for AccountRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRuleError::Inactive(status) => write!(f, "account is {}", status),
            AccountRuleError::InsufficientFunds { balance, requested } => write!(
                f,
                "insufficient balance: available {}, requested {}",
                balance, requested
            ),
            AccountRuleError::BalanceLimitExceeded { balance, requested } => write!(
                f,
                "depositing {} onto {} would exceed the balance limit",
                requested, balance
            ),
            AccountRuleError::AlreadyClosed => write!(f, "account is already closed"),
            AccountRuleError::NonZeroBalance(balance) => {
                write!(f, "account balance is {}, not zero", balance)
            }
        }
    }
}

impl std::error::Error for AccountRuleError {}
