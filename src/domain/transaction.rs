use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::{UnknownVariant, normalize_variant};
use super::{AccountNumber, Amount};

pub type TransactionId = i64;

pub const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Cash deposit";
pub const DEFAULT_WITHDRAWAL_DESCRIPTION: &str = "Cash withdrawal";
pub const DESCRIPTION_MAX_CHARS: usize = 255;

/// Size of the "recent transactions" window.
pub const RECENT_TRANSACTIONS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
        }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            TransactionType::Deposit => DEFAULT_DEPOSIT_DESCRIPTION,
            TransactionType::Withdrawal => DEFAULT_WITHDRAWAL_DESCRIPTION,
        }
    }
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_variant(s).as_str() {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" | "WITHDRAW" => Ok(TransactionType::Withdrawal),
            _ => Err(UnknownVariant::new("transaction type", s)),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger row. Transactions are append-only: once stored they are never
/// updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_number: AccountNumber,
    pub transaction_type: TransactionType,
    /// Always positive
    pub amount: Amount,
    /// Account balance right after this transaction was applied
    pub balance_after: Amount,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger row waiting for its store-generated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_number: AccountNumber,
    pub transaction_type: TransactionType,
    pub amount: Amount,
    pub balance_after: Amount,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account_number: self.account_number,
            transaction_type: self.transaction_type,
            amount: self.amount,
            balance_after: self.balance_after,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// Resolve the description stored with a transaction: blank input falls back
/// to the per-type default.
pub fn resolve_description(
    transaction_type: TransactionType,
    description: Option<String>,
) -> Result<String, DescriptionTooLong> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| transaction_type.default_description().to_string());

    let len = description.chars().count();
    if len > DESCRIPTION_MAX_CHARS {
        return Err(DescriptionTooLong(len));
    }
    Ok(description)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionTooLong(pub usize);

impl fmt::Display for DescriptionTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "description must not exceed {} characters, got {}",
            DESCRIPTION_MAX_CHARS, self.0
        )
    }
}

impl std::error::Error for DescriptionTooLong {}
