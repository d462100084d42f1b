use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Money is an exact decimal. Amounts and balances always carry two fraction
/// digits once they pass through [`normalize_amount`] or [`normalize_balance`].
pub type Amount = Decimal;

/// Number of fraction digits kept for every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest balance a single account may hold (13 integer digits).
pub fn max_balance() -> Decimal {
    Decimal::new(9_999_999_999_999_99, MONEY_SCALE)
}

/// Format an amount as a human-readable string with exactly two decimals.
/// Example: 50 -> "50.00", -12.3 -> "-12.30"
pub fn format_amount(amount: Amount) -> String {
    let mut value = amount.round_dp(MONEY_SCALE);
    value.rescale(MONEY_SCALE);
    value.to_string()
}

/// Parse a decimal string into an amount without rounding.
/// Example: "50.00" -> 50.00, "12.5" -> 12.5, ".5" -> 0.5
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    // Decimal::from_str rejects a bare leading dot
    let candidate = match input.strip_prefix('.') {
        Some(rest) => format!("0.{}", rest),
        None => input.to_string(),
    };

    Decimal::from_str(&candidate).map_err(|_| ParseAmountError::InvalidFormat)
}

/// Validate a caller-supplied transaction amount and bring it to money scale.
pub fn normalize_amount(amount: Amount) -> Result<Amount, AmountError> {
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive(amount));
    }

    let normalized = amount.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(AmountError::TooPrecise(amount));
    }
    if normalized > max_balance() {
        return Err(AmountError::TooLarge(amount));
    }

    let mut value = normalized;
    value.rescale(MONEY_SCALE);
    Ok(value)
}

/// Bring a computed balance to money scale. Balances are sums and differences
/// of normalized amounts, so no rounding ever happens here.
pub fn normalize_balance(balance: Amount) -> Amount {
    let mut value = balance;
    value.rescale(MONEY_SCALE);
    value
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    NotPositive(Amount),
    TooPrecise(Amount),
    TooLarge(Amount),
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::NotPositive(amount) => {
                write!(f, "amount must be greater than zero, got {}", amount)
            }
            AmountError::TooPrecise(amount) => write!(
                f,
                "amount {} has more than {} decimal places",
                amount, MONEY_SCALE
            ),
            AmountError::TooLarge(amount) => write!(
                f,
                "amount {} exceeds the maximum of {}",
                amount,
                format_amount(max_balance())
            ),
        }
    }
}

impl std::error::Error for AmountError {}
