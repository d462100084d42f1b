mod common;

use anyhow::Result;
use bankdesk::application::AppError;
use bankdesk::io::StatementExporter;
use chrono::Duration;
use common::{ada_with_savings, start_time, test_service, test_service_with_clock};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_export_csv() -> Result<()> {
    let (service, clock, _temp) = test_service_with_clock().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();

    clock.advance(Duration::minutes(1));
    service
        .transactions()
        .deposit(number, dec!(100), Some("Opening, with comma".into()))
        .await?;
    clock.advance(Duration::minutes(1));
    service.transactions().withdraw(number, dec!(40.00), None).await?;

    let mut buf = Vec::new();
    let count = StatementExporter::new(&service)
        .export_csv(number, &mut buf)
        .await?;
    assert_eq!(count, 2);

    let output = String::from_utf8(buf)?;
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(
        lines[0],
        "id,account_number,type,amount,balance_after,description,created_at"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains(",WITHDRAWAL,40.00,60.00,Cash withdrawal,2024-01-15T10:02:00Z"));
    assert!(lines[2].contains(",DEPOSIT,100.00,100.00,\"Opening, with comma\",2024-01-15T10:01:00Z"));
    Ok(())
}

#[tokio::test]
async fn test_export_json_statement() -> Result<()> {
    let (service, _clock, _temp) = test_service_with_clock().await?;
    let (_ada, account) = ada_with_savings(&service).await?;
    let number = account.account_number.as_str();

    service.transactions().deposit(number, dec!(12.50), None).await?;

    let mut buf = Vec::new();
    let count = StatementExporter::new(&service)
        .export_json(number, &mut buf)
        .await?;
    assert_eq!(count, 1);

    let statement: serde_json::Value = serde_json::from_slice(&buf)?;
    assert_eq!(statement["account"]["customer_name"], "Ada Lovelace");
    assert_eq!(statement["account"]["account"]["account_number"], number);
    assert_eq!(statement["account"]["account"]["account_type"], "SAVINGS");
    assert_eq!(statement["account"]["account"]["balance"], "12.50");
    assert!(statement["account"]["account"].get("version").is_none());
    assert_eq!(
        statement["exported_at"],
        serde_json::to_value(start_time())?
    );

    let transactions = statement["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transaction_type"], "DEPOSIT");
    assert_eq!(transactions[0]["amount"], "12.50");
    assert_eq!(transactions[0]["description"], "Cash deposit");
    Ok(())
}

#[tokio::test]
async fn test_export_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let exporter = StatementExporter::new(&service);

    let err = exporter.export_csv("ACC404", Vec::new()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::AccountNotFound(_))
    ));
    Ok(())
}
