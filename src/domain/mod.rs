mod account;
mod clock;
mod customer;
mod money;
mod transaction;

pub use account::*;
pub use clock::*;
pub use customer::*;
pub use money::*;
pub use transaction::*;
