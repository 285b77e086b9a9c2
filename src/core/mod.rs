pub mod error;
pub mod expense;
pub mod ledger;
pub mod summary;

pub use error::{LedgerError, LedgerResult};
pub use expense::{Amount, Expense};
pub use ledger::Ledger;
pub use summary::Summary;
