use thiserror::Error;

/// Failures surfaced by the ledger stores.
///
/// Only `StorageWrite` and `InvalidExpense` are expected to reach a caller:
/// read failures are absorbed into an empty ledger and remote failures are
/// logged and swallowed by the stores themselves.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The stored blob could not be read or parsed.
    #[error("failed to read stored expenses: {0}")]
    StorageRead(String),
    /// The new ledger could not be written. The previously stored
    /// ledger is left untouched.
    #[error("failed to write expenses: {0}")]
    StorageWrite(String),
    /// A call against the hosted document collection failed.
    #[error("remote operation failed: {0}")]
    RemoteOperation(String),
    /// A candidate record was rejected before reaching storage.
    #[error("invalid expense: {0}")]
    InvalidExpense(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
