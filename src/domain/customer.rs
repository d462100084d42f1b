use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::validate_email;

pub type CustomerId = i64;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 100;
pub const PHONE_MAX_CHARS: usize = 20;

/// A bank customer. Owns accounts by reference only (accounts carry the
/// customer id, the customer carries nothing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a customer that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewCustomer {
    /// Trim and validate the raw fields. Blank optional fields count as absent,
    /// emails are lower-cased so uniqueness is case-insensitive.
    pub fn new(
        name: impl Into<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Self, CustomerValidationError> {
        let name = name.into().trim().to_string();
        let name_len = name.chars().count();
        if name_len == 0 {
            return Err(CustomerValidationError::NameRequired);
        }
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            return Err(CustomerValidationError::NameLength(name_len));
        }

        let email = non_blank(email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            if email.chars().count() > EMAIL_MAX_CHARS {
                return Err(CustomerValidationError::EmailTooLong);
            }
            if !is_well_formed_email(email) {
                return Err(CustomerValidationError::EmailMalformed(email.clone()));
            }
        }

        let phone = non_blank(phone);
        if let Some(phone) = &phone {
            if phone.chars().count() > PHONE_MAX_CHARS {
                return Err(CustomerValidationError::PhoneTooLong);
            }
        }

        Ok(Self { name, email, phone })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Email shape check on top of `validator`: the domain must also be dotted,
/// so bare hosts like `localhost` are refused.
pub fn is_well_formed_email(email: &str) -> bool {
    validate_email(email)
        && email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerValidationError {
    NameRequired,
    NameLength(usize),
    EmailMalformed(String),
    EmailTooLong,
    PhoneTooLong,
}

impl fmt::Display for CustomerValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerValidationError::NameRequired => write!(f, "customer name is required"),
            CustomerValidationError::NameLength(len) => write!(
                f,
                "name must be between {} and {} characters, got {}",
                NAME_MIN_CHARS, NAME_MAX_CHARS, len
            ),
            CustomerValidationError::EmailMalformed(email) => {
                write!(f, "email is not valid: {}", email)
            }
            CustomerValidationError::EmailTooLong => write!(
                f,
                "email must not exceed {} characters",
                EMAIL_MAX_CHARS
            ),
            CustomerValidationError::PhoneTooLong => write!(
                f,
                "phone number must not exceed {} characters",
                PHONE_MAX_CHARS
            ),
        }
    }
}

impl std::error::Error for CustomerValidationError {}
