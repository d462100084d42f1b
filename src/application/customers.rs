use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Clock, Customer, CustomerId, NewCustomer};
use crate::storage::{Repository, is_unique_violation};

use super::AppError;

/// Registration and lookup of bank customers.
#[derive(Clone)]
pub struct CustomerRegistry {
    repo: Repository,
    clock: Arc<dyn Clock>,
}

impl CustomerRegistry {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Register a new customer.
    ///
    /// The email is optional; when present it is compared and stored
    /// lower-cased. A concurrent registration that slips past the up-front
    /// check still trips the UNIQUE index and is reported the same way.
    pub async fn create_customer(
        &self,
        name: &str,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Customer, AppError> {
        let new_customer = NewCustomer::new(name, email, phone)?;

        if let Some(email) = &new_customer.email {
            if self.repo.customer_email_exists(email).await? {
                warn!(email = %email, "rejected duplicate customer email");
                return Err(AppError::DuplicateEmail(email.clone()));
            }
        }

        let customer = match self.repo.save_customer(&new_customer, self.clock.now()).await {
            Ok(customer) => customer,
            Err(err) if is_unique_violation(&err) => {
                let email = new_customer.email.unwrap_or_default();
                warn!(email = %email, "customer email registered concurrently");
                return Err(AppError::DuplicateEmail(email));
            }
            Err(err) => return Err(err.into()),
        };

        info!(customer_id = customer.id, name = %customer.name, "customer created");
        Ok(customer)
    }

    pub async fn find_customer_by_id(&self, id: CustomerId) -> Result<Customer, AppError> {
        debug!(customer_id = id, "looking up customer");
        self.repo
            .get_customer(id)
            .await?
            .ok_or(AppError::CustomerNotFound(id))
    }

    /// All customers in registration order.
    pub async fn find_all_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.repo.list_customers().await?)
    }

    /// Case-insensitive substring search on the customer name.
    pub async fn find_customers_by_name(&self, term: &str) -> Result<Vec<Customer>, AppError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::Validation(
                "search term must not be empty".to_string(),
            ));
        }
        debug!(term, "searching customers by name");
        Ok(self.repo.search_customers_by_name(term).await?)
    }

    pub async fn get_customer_count(&self) -> Result<u64, AppError> {
        Ok(self.repo.count_customers().await?)
    }

    pub async fn customer_exists(&self, id: CustomerId) -> Result<bool, AppError> {
        Ok(self.repo.customer_exists(id).await?)
    }
}
