// Statement export of an account's ledger

pub mod export;

pub use export::*;
