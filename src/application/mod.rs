// Application layer: customer registry, account ledger and transaction flow,
// composed behind BankService.

pub mod accounts;
pub mod customers;
pub mod error;
pub mod service;
pub mod transactions;

pub use accounts::*;
pub use customers::*;
pub use error::*;
pub use service::*;
pub use transactions::*;
