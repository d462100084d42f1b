use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::application::{AccountInfo, BankService};
use crate::domain::{Transaction, format_amount};

/// Statement document written by [`StatementExporter::export_json`]
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub account: AccountInfo,
    pub exported_at: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
}

/// Writes an account's ledger out as a statement
pub struct StatementExporter<'a> {
    service: &'a BankService,
}

impl<'a> StatementExporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export the account's transactions to CSV, newest first.
    /// Returns the number of rows written.
    pub async fn export_csv<W: Write>(&self, account_number: &str, writer: W) -> Result<usize> {
        let transactions = self
            .service
            .transactions()
            .get_transaction_history(account_number)
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "account_number",
            "type",
            "amount",
            "balance_after",
            "description",
            "created_at",
        ])?;

        let mut count = 0;
        for tx in &transactions {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.account_number.clone(),
                tx.transaction_type.as_str().to_string(),
                format_amount(tx.amount),
                format_amount(tx.balance_after),
                tx.description.clone().unwrap_or_default(),
                tx.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the account details and its transactions as a pretty-printed
    /// JSON [`Statement`]. Returns the number of transactions written.
    pub async fn export_json<W: Write>(&self, account_number: &str, mut writer: W) -> Result<usize> {
        let account = self.service.accounts().get_account_info(account_number).await?;
        let transactions = self
            .service
            .transactions()
            .get_transaction_history(account_number)
            .await?;

        let statement = Statement {
            account,
            exported_at: self.service.clock().now(),
            transactions,
        };

        serde_json::to_writer_pretty(&mut writer, &statement)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(statement.transactions.len())
    }
}
