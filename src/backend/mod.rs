mod interface;
mod json_store;
mod memory_store;
mod local;

pub use interface::{KeyValueStore, Result, BackendError};
pub use json_store::FileStore;
pub use memory_store::MemoryStore;
pub use local::{LocalLedgerStore, EXPENSES_KEY};
