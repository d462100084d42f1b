mod common;

use anyhow::Result;
use bankdesk::domain::{AccountStatus, NewCustomer, NewTransaction, TransactionType};
use bankdesk::storage::{Repository, StoreOptions, is_unique_violation};
use common::{ada_with_savings, start_time, test_service};
use rust_decimal_macros::dec;
use tempfile::TempDir;

#[tokio::test]
async fn test_stale_version_is_not_written() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let repo = service.repository();

    let mut uow = repo.begin().await?;
    let current = uow.lock_account(&account.account_number).await?.unwrap();
    let updated = uow
        .write_account(&current, dec!(5.00), AccountStatus::Active, start_time())
        .await?
        .unwrap();
    assert_eq!(updated.version, current.version + 1);

    // Writing again from the old snapshot must not match any row
    let stale = uow
        .write_account(&current, dec!(9.00), AccountStatus::Active, start_time())
        .await?;
    assert!(stale.is_none());
    uow.commit().await?;

    let stored = repo.get_account(&account.account_number).await?.unwrap();
    assert_eq!(stored.balance, dec!(5.00));
    assert_eq!(stored.version, updated.version);
    Ok(())
}

#[tokio::test]
async fn test_dropped_unit_of_work_rolls_back() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let repo = service.repository();

    {
        let mut uow = repo.begin().await?;
        let current = uow.lock_account(&account.account_number).await?.unwrap();
        uow.write_account(&current, dec!(70.00), AccountStatus::Active, start_time())
            .await?;
        uow.append_transaction(NewTransaction {
            account_number: account.account_number.clone(),
            transaction_type: TransactionType::Deposit,
            amount: dec!(70.00),
            balance_after: dec!(70.00),
            description: None,
            created_at: start_time(),
        })
        .await?;
    }

    let stored = repo.get_account(&account.account_number).await?.unwrap();
    assert_eq!(stored.balance, dec!(0.00));
    assert_eq!(repo.count_transactions(&account.account_number).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_ledger_rows_are_append_only() -> Result<()> {
    let (service, temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let tx = service
        .transactions()
        .deposit(&account.account_number, dec!(1.00), None)
        .await?;

    let url = format!("sqlite:{}", temp.path().join("test.db").display());
    let pool = sqlx::SqlitePool::connect(&url).await?;
    assert!(
        sqlx::query("UPDATE transactions SET amount = '999.00'")
            .execute(&pool)
            .await
            .is_err()
    );
    assert!(
        sqlx::query("DELETE FROM transactions")
            .execute(&pool)
            .await
            .is_err()
    );
    pool.close().await;

    let stored = service
        .repository()
        .list_transactions(&account.account_number, None)
        .await?;
    assert_eq!(stored, vec![tx]);
    Ok(())
}

#[tokio::test]
async fn test_unique_violation_is_detected() -> Result<()> {
    let temp = TempDir::new()?;
    let repo = Repository::init(temp.path().join("unique.db"), &StoreOptions::default()).await?;

    let customer = NewCustomer::new("Ada Lovelace", Some("ada@example.com".into()), None)?;
    repo.save_customer(&customer, start_time()).await?;
    let err = repo.save_customer(&customer, start_time()).await.unwrap_err();
    assert!(is_unique_violation(&err));

    let other = NewCustomer::new("Grace Hopper", None, None)?;
    let saved = repo.save_customer(&other, start_time()).await?;
    assert!(repo.customer_exists(saved.id).await?);
    assert!(!is_unique_violation(&anyhow::anyhow!("disk full")));
    Ok(())
}

#[tokio::test]
async fn test_open_missing_database_without_create_fails() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("missing.db");

    assert!(
        Repository::open(&path, &StoreOptions::default(), false)
            .await
            .is_err()
    );
    assert!(!path.exists());
    Ok(())
}
