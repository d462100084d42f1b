mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::application::{AppError, BankService, ErrorCategory};
use crate::domain::{
    Account, AccountStatus, AccountType, Amount, CustomerId, Transaction, TransactionType,
    format_amount, parse_amount,
};

pub use logging::init_tracing;

/// Bankdesk - Bank back-office core
#[derive(Parser)]
#[command(name = "bankdesk")]
#[command(about = "Customers, accounts and cash transactions on a local ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "BANKDESK_DATABASE", default_value = "bankdesk.db")]
    pub database: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit cash into an account
    Deposit {
        /// Account number
        account: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        /// Description of the deposit
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Withdraw cash from an account
    Withdraw {
        /// Account number
        account: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,

        /// Description of the withdrawal
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show the transaction history of an account, newest first
    History {
        /// Account number
        account: String,

        /// Only the most recent transactions
        #[arg(long, conflicts_with = "transaction_type")]
        recent: bool,

        /// Filter by type: deposit, withdrawal
        #[arg(short = 't', long = "type")]
        transaction_type: Option<String>,
    },

    /// Count the transactions of an account
    Count {
        /// Account number
        account: String,
    },

    /// Export an account statement to CSV or JSON
    Export {
        /// Account number
        account: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Create {
        /// Full name
        name: String,

        /// Email address (must be unique)
        #[arg(short, long)]
        email: Option<String>,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,
    },

    /// Show a customer and their accounts
    Show {
        /// Customer ID
        id: CustomerId,
    },

    /// List all customers
    List,

    /// Search customers by name
    Search {
        /// Part of the name, case-insensitive
        term: String,
    },

    /// Number of registered customers
    Count,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account for a customer
    Open {
        /// Customer ID
        #[arg(short, long)]
        customer: CustomerId,

        /// Account type: savings, checking, current, fixed-deposit
        #[arg(short = 't', long = "type")]
        account_type: String,
    },

    /// Show account details
    Show {
        /// Account number
        account: String,
    },

    /// Close an account with a zero balance
    Close {
        /// Account number
        account: String,
    },

    /// List the accounts of a customer
    List {
        /// Customer ID
        #[arg(short, long)]
        customer: CustomerId,

        /// Only active accounts
        #[arg(long)]
        active: bool,
    },

    /// List all accounts with a given status
    Status {
        /// Status: active, closed
        status: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                BankService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Customer(customer_cmd) => {
                let service = BankService::connect(&self.database).await?;
                run_customer_command(&service, customer_cmd).await?;
            }

            Commands::Account(account_cmd) => {
                let service = BankService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Deposit {
                account,
                amount,
                description,
            } => {
                let service = BankService::connect(&self.database).await?;
                let amount = parse_amount_arg(&amount)?;
                let tx = service
                    .transactions()
                    .deposit(&account, amount, description)
                    .await?;
                println!(
                    "Deposited {} into {} (balance: {})",
                    format_amount(tx.amount),
                    tx.account_number,
                    format_amount(tx.balance_after)
                );
            }

            Commands::Withdraw {
                account,
                amount,
                description,
            } => {
                let service = BankService::connect(&self.database).await?;
                let amount = parse_amount_arg(&amount)?;
                let tx = service
                    .transactions()
                    .withdraw(&account, amount, description)
                    .await?;
                println!(
                    "Withdrew {} from {} (balance: {})",
                    format_amount(tx.amount),
                    tx.account_number,
                    format_amount(tx.balance_after)
                );
            }

            Commands::History {
                account,
                recent,
                transaction_type,
            } => {
                let service = BankService::connect(&self.database).await?;
                run_history_command(&service, &account, recent, transaction_type).await?;
            }

            Commands::Count { account } => {
                let service = BankService::connect(&self.database).await?;
                let count = service.transactions().get_transaction_count(&account).await?;
                println!("{}: {} transaction(s)", account, count);
            }

            Commands::Export {
                account,
                format,
                output,
            } => {
                let service = BankService::connect(&self.database).await?;
                run_export_command(&service, &account, format, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

/// Process exit code for a failed command, by error category.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<AppError>())
        .map(AppError::category)
        .unwrap_or(ErrorCategory::Internal)
        .exit_code()
}

async fn run_customer_command(service: &BankService, cmd: CustomerCommands) -> Result<()> {
    let customers = service.customers();

    match cmd {
        CustomerCommands::Create { name, email, phone } => {
            let customer = customers.create_customer(&name, email, phone).await?;
            println!("Created customer #{}: {}", customer.id, customer.name);
        }

        CustomerCommands::Show { id } => {
            let customer = customers.find_customer_by_id(id).await?;
            let accounts = service.accounts().find_accounts_by_customer_id(id).await?;

            println!("Customer #{}", customer.id);
            println!("  Name:     {}", customer.name);
            println!("  Email:    {}", customer.email.as_deref().unwrap_or("-"));
            println!("  Phone:    {}", customer.phone.as_deref().unwrap_or("-"));
            println!(
                "  Created:  {}",
                customer.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            if accounts.is_empty() {
                println!("  No accounts.");
            } else {
                print_accounts(&accounts);
            }
        }

        CustomerCommands::List => {
            let all = customers.find_all_customers().await?;
            print_customers(&all);
        }

        CustomerCommands::Search { term } => {
            let found = customers.find_customers_by_name(&term).await?;
            print_customers(&found);
        }

        CustomerCommands::Count => {
            println!("{}", customers.get_customer_count().await?);
        }
    }
    Ok(())
}

async fn run_account_command(service: &BankService, cmd: AccountCommands) -> Result<()> {
    let accounts = service.accounts();

    match cmd {
        AccountCommands::Open {
            customer,
            account_type,
        } => {
            let at: AccountType = account_type.parse().map_err(|e| {
                AppError::Validation(format!(
                    "{}. Valid types: savings, checking, current, fixed-deposit",
                    e
                ))
            })?;
            let account = accounts.create_account(customer, at).await?;
            println!(
                "Opened {} account {} for customer #{}",
                account.account_type, account.account_number, account.customer_id
            );
        }

        AccountCommands::Show { account } => {
            let info = accounts.get_account_info(&account).await?;
            let account = &info.account;

            println!("Account: {}", account.account_number);
            println!("  Holder:   {} (#{})", info.customer_name, account.customer_id);
            println!("  Type:     {}", account.account_type);
            println!("  Status:   {}", account.status);
            println!("  Balance:  {}", format_amount(account.balance));
            println!(
                "  Opened:   {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "  Updated:  {}",
                account.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        AccountCommands::Close { account } => {
            let closed = accounts.close_account(&account).await?;
            println!("Closed account: {}", closed.account_number);
        }

        AccountCommands::List { customer, active } => {
            let list = if active {
                accounts.find_active_accounts_by_customer_id(customer).await?
            } else {
                accounts.find_accounts_by_customer_id(customer).await?
            };
            if list.is_empty() {
                println!("No accounts found.");
            } else {
                print_accounts(&list);
            }
        }

        AccountCommands::Status { status } => {
            let status: AccountStatus = status
                .parse()
                .map_err(|e| AppError::Validation(format!("{}. Valid: active, closed", e)))?;
            let list = accounts.find_accounts_by_status(status).await?;
            if list.is_empty() {
                println!("No accounts found.");
            } else {
                print_accounts(&list);
            }
        }
    }
    Ok(())
}

async fn run_history_command(
    service: &BankService,
    account: &str,
    recent: bool,
    transaction_type: Option<String>,
) -> Result<()> {
    let transactions = service.transactions();

    let list = match transaction_type {
        Some(tt) => {
            let tt: TransactionType = tt.parse().map_err(|e| {
                AppError::Validation(format!("{}. Valid types: deposit, withdrawal", e))
            })?;
            transactions.get_transactions_by_type(account, tt).await?
        }
        None if recent => transactions.get_recent_transactions(account).await?,
        None => transactions.get_transaction_history(account).await?,
    };

    print_transactions(&list);
    Ok(())
}

async fn run_export_command(
    service: &BankService,
    account: &str,
    format: ExportFormat,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::StatementExporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = StatementExporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match format {
        ExportFormat::Csv => exporter.export_csv(account, writer).await?,
        ExportFormat::Json => exporter.export_json(account, writer).await?,
    };
    if output.is_some() {
        eprintln!("Exported {} transactions", count);
    }

    Ok(())
}

fn parse_amount_arg(input: &str) -> Result<Amount> {
    parse_amount(input)
        .map_err(|e| AppError::Validation(format!("Invalid amount '{}': {}", input, e)).into())
}

fn print_customers(customers: &[crate::domain::Customer]) {
    if customers.is_empty() {
        println!("No customers found.");
        return;
    }
    println!("{:<6} {:<30} {:<30} {:<15}", "ID", "NAME", "EMAIL", "PHONE");
    println!("{}", "-".repeat(84));
    for c in customers {
        println!(
            "{:<6} {:<30} {:<30} {:<15}",
            c.id,
            truncate(&c.name, 30),
            truncate(c.email.as_deref().unwrap_or(""), 30),
            c.phone.as_deref().unwrap_or("")
        );
    }
}

fn print_accounts(accounts: &[Account]) {
    println!(
        "{:<22} {:<14} {:<8} {:>16} {:>8}",
        "ACCOUNT", "TYPE", "STATUS", "BALANCE", "CUSTOMER"
    );
    println!("{}", "-".repeat(72));
    for a in accounts {
        println!(
            "{:<22} {:<14} {:<8} {:>16} {:>8}",
            a.account_number,
            a.account_type,
            a.status,
            format_amount(a.balance),
            a.customer_id
        );
    }
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }
    println!(
        "{:<20} {:<11} {:>14} {:>16} DESCRIPTION",
        "DATE", "TYPE", "AMOUNT", "BALANCE"
    );
    println!("{}", "-".repeat(80));
    for tx in transactions {
        println!(
            "{:<20} {:<11} {:>14} {:>16} {}",
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            tx.transaction_type,
            format_amount(tx.amount),
            format_amount(tx.balance_after),
            truncate(tx.description.as_deref().unwrap_or(""), 30)
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
