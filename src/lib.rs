mod core;
pub mod backend;
pub mod config;
pub mod remote;

pub use crate::core::{Expense, Ledger, LedgerError, LedgerResult, Summary};
pub use crate::core::{error, expense, ledger, summary};
