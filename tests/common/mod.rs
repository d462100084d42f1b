// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use bankdesk::application::BankService;
use bankdesk::domain::{Account, AccountType, Customer, FixedClock};
use bankdesk::storage::{Repository, StoreOptions};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BankService::init(&db_path).await?;
    Ok((service, temp_dir))
}

/// Start of every test clock: 2024-01-15 10:00:00 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

/// Test service whose clock only moves when the test says so
pub async fn test_service_with_clock() -> Result<(BankService, Arc<FixedClock>, TempDir)> {
    test_service_with_parts(Box::new(StdRng::seed_from_u64(7))).await
}

/// Test service with a fixed clock and a caller-chosen random source
pub async fn test_service_with_parts(
    rng: Box<dyn RngCore + Send>,
) -> Result<(BankService, Arc<FixedClock>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&db_path, &StoreOptions::default()).await?;
    let clock = Arc::new(FixedClock::new(start_time()));
    let service = BankService::with_parts(repo, clock.clone(), rng);
    Ok((service, clock, temp_dir))
}

/// Register Ada Lovelace, the customer most tests revolve around
pub async fn create_ada(service: &BankService) -> Result<Customer> {
    Ok(service
        .customers()
        .create_customer(
            "Ada Lovelace",
            Some("ada@example.com".into()),
            Some("+44 20 7946 0000".into()),
        )
        .await?)
}

/// Register Ada and open a savings account for her
pub async fn ada_with_savings(service: &BankService) -> Result<(Customer, Account)> {
    let ada = create_ada(service).await?;
    let account = service
        .accounts()
        .create_account(ada.id, AccountType::Savings)
        .await?;
    Ok((ada, account))
}
