mod common;

use anyhow::Result;
use bankdesk::application::{AppError, ErrorCategory};
use bankdesk::domain::{AccountStatus, AccountType, TransactionType};
use chrono::Duration;
use common::{ada_with_savings, create_ada, start_time, test_service, test_service_with_clock};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_ada_lovelace_account_lifecycle() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();
    let accounts = service.accounts();
    let transactions = service.transactions();

    assert_eq!(account.balance, Decimal::ZERO);
    assert_eq!(account.status, AccountStatus::Active);

    let deposit = transactions.deposit(number, dec!(100.00), None).await?;
    assert_eq!(deposit.transaction_type, TransactionType::Deposit);
    assert_eq!(deposit.balance_after, dec!(100.00));
    assert_eq!(deposit.description.as_deref(), Some("Cash deposit"));
    assert_eq!(accounts.find_by_account_number(number).await?.balance, dec!(100.00));
    assert_eq!(transactions.get_transaction_count(number).await?, 1);

    let withdrawal = transactions.withdraw(number, dec!(40.00), None).await?;
    assert_eq!(withdrawal.transaction_type, TransactionType::Withdrawal);
    assert_eq!(withdrawal.balance_after, dec!(60.00));
    assert_eq!(withdrawal.description.as_deref(), Some("Cash withdrawal"));
    assert_eq!(transactions.get_transaction_count(number).await?, 2);

    let err = transactions
        .withdraw(number, dec!(1000.00), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds { .. }));
    assert_eq!(accounts.find_by_account_number(number).await?.balance, dec!(60.00));
    assert_eq!(transactions.get_transaction_count(number).await?, 2);

    let err = accounts.close_account(number).await.unwrap_err();
    assert!(matches!(err, AppError::NonZeroBalance { .. }));

    let emptied = transactions.withdraw(number, dec!(60.00), None).await?;
    assert_eq!(emptied.balance_after.to_string(), "0.00");

    let closed = accounts.close_account(number).await?;
    assert_eq!(closed.status, AccountStatus::Closed);
    assert_eq!(transactions.get_transaction_count(number).await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_balance_after_matches_account_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();

    let steps = [
        (TransactionType::Deposit, dec!(250.75)),
        (TransactionType::Withdrawal, dec!(0.75)),
        (TransactionType::Deposit, dec!(19.99)),
        (TransactionType::Withdrawal, dec!(269.99)),
    ];
    for (transaction_type, amount) in steps {
        let tx = match transaction_type {
            TransactionType::Deposit => service.transactions().deposit(number, amount, None).await?,
            TransactionType::Withdrawal => {
                service.transactions().withdraw(number, amount, None).await?
            }
        };
        let balance = service
            .accounts()
            .find_by_account_number(number)
            .await?
            .balance;
        assert_eq!(tx.balance_after, balance);
        assert_eq!(tx.amount, amount);
    }

    assert_eq!(
        service.accounts().find_by_account_number(number).await?.balance,
        dec!(0.00)
    );
    Ok(())
}

#[tokio::test]
async fn test_deposit_then_withdraw_restores_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();

    service.transactions().deposit(number, dec!(10.10), None).await?;
    service.transactions().deposit(number, dec!(0.20), None).await?;
    let before = service.accounts().find_by_account_number(number).await?.balance;

    service.transactions().deposit(number, dec!(0.1), None).await?;
    service.transactions().withdraw(number, dec!(0.10), None).await?;

    let after = service.accounts().find_by_account_number(number).await?.balance;
    assert_eq!(after, before);
    assert_eq!(after.to_string(), "10.30");
    Ok(())
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();

    for amount in [dec!(0), dec!(-5.00), dec!(1.005)] {
        let err = service
            .transactions()
            .deposit(number, amount, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{}", err);
        assert_eq!(err.category().http_status(), 400);

        let err = service
            .transactions()
            .withdraw(number, amount, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{}", err);
    }

    let err = service
        .transactions()
        .deposit(number, dec!(1.00), Some("x".repeat(256)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(service.transactions().get_transaction_count(number).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_transactions_on_unknown_or_closed_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();

    let err = service
        .transactions()
        .deposit("ACC404", dec!(1.00), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    service.accounts().close_account(number).await?;

    let err = service
        .transactions()
        .deposit(number, dec!(1.00), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InactiveAccount { status: AccountStatus::Closed, .. }
    ));
    assert_eq!(err.category(), ErrorCategory::Conflict);

    let err = service
        .transactions()
        .withdraw(number, dec!(1.00), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InactiveAccount { .. }));

    for result in [
        service.transactions().get_transaction_history("ACC404").await.map(|_| ()),
        service.transactions().get_recent_transactions("ACC404").await.map(|_| ()),
        service
            .transactions()
            .get_transactions_by_type("ACC404", TransactionType::Deposit)
            .await
            .map(|_| ()),
        service.transactions().get_transaction_count("ACC404").await.map(|_| ()),
    ] {
        assert!(matches!(result, Err(AppError::AccountNotFound(_))));
    }
    Ok(())
}

#[tokio::test]
async fn test_history_is_newest_first() -> Result<()> {
    let (service, clock, _temp) = test_service_with_clock().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();
    let transactions = service.transactions();

    clock.advance(Duration::minutes(1));
    let first = transactions.deposit(number, dec!(10.00), Some("salary".into())).await?;
    clock.advance(Duration::minutes(1));
    let second = transactions.withdraw(number, dec!(3.00), None).await?;
    // Same timestamp as the withdrawal: the later row wins the tie
    let third = transactions.deposit(number, dec!(1.00), None).await?;

    assert_eq!(first.created_at, start_time() + Duration::minutes(1));
    assert_eq!(second.created_at, third.created_at);

    let history = transactions.get_transaction_history(number).await?;
    let ids: Vec<_> = history.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
    assert_eq!(history[2].description.as_deref(), Some("salary"));

    let deposits = transactions
        .get_transactions_by_type(number, TransactionType::Deposit)
        .await?;
    let ids: Vec<_> = deposits.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, first.id]);

    let withdrawals = transactions
        .get_transactions_by_type(number, TransactionType::Withdrawal)
        .await?;
    assert_eq!(withdrawals, vec![second]);
    Ok(())
}

#[tokio::test]
async fn test_recent_transactions_are_capped() -> Result<()> {
    let (service, clock, _temp) = test_service_with_clock().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();

    let mut ids = Vec::new();
    for i in 1..=12 {
        clock.advance(Duration::seconds(1));
        let tx = service
            .transactions()
            .deposit(number, Decimal::new(i * 100, 2), None)
            .await?;
        ids.push(tx.id);
    }

    let recent = service.transactions().get_recent_transactions(number).await?;
    assert_eq!(recent.len(), 10);
    let expected: Vec<_> = ids.iter().rev().take(10).copied().collect();
    let got: Vec<_> = recent.iter().map(|t| t.id).collect();
    assert_eq!(got, expected);

    assert_eq!(service.transactions().get_transaction_history(number).await?.len(), 12);
    assert_eq!(service.transactions().get_transaction_count(number).await?, 12);
    Ok(())
}

#[tokio::test]
async fn test_ledgers_are_per_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ada = create_ada(&service).await?;
    let savings = service.accounts().create_account(ada.id, AccountType::Savings).await?;
    let current = service.accounts().create_account(ada.id, AccountType::Current).await?;

    service
        .transactions()
        .deposit(&savings.account_number, dec!(5.00), None)
        .await?;

    assert_eq!(
        service.transactions().get_transaction_count(&savings.account_number).await?,
        1
    );
    assert!(
        service
            .transactions()
            .get_transaction_history(&current.account_number)
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_withdrawals_never_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.clone();

    service.transactions().deposit(&number, dec!(100.00), None).await?;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        let number = number.clone();
        handles.push(tokio::spawn(async move {
            service.transactions().withdraw(&number, dec!(60.00), None).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await? {
            Ok(tx) => {
                succeeded += 1;
                assert_eq!(tx.balance_after, dec!(40.00));
            }
            Err(err) => assert_eq!(err.category(), ErrorCategory::Conflict, "{}", err),
        }
    }
    assert_eq!(succeeded, 1);

    let stored = service.accounts().find_by_account_number(&number).await?;
    assert_eq!(stored.balance, dec!(40.00));
    assert_eq!(
        service
            .transactions()
            .get_transactions_by_type(&number, TransactionType::Withdrawal)
            .await?
            .len(),
        1
    );
    Ok(())
}
