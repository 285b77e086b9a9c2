use log::{debug, error, warn};

use crate::backend::interface::KeyValueStore;
use crate::core::{Expense, Ledger, LedgerError, LedgerResult};

/// Storage key the whole ledger is kept under.
pub const EXPENSES_KEY: &str = "@expenses_key";

/// The device-local ledger: a JSON array stored under one key and
/// rewritten whole on every mutation.
///
/// Operations are not serialised against each other. Two overlapping
/// read-modify-write cycles (say an `append` racing a `delete_at`) both
/// start from the same snapshot and the last write wins.
pub struct LocalLedgerStore<S: KeyValueStore> {
    store: S,
    key: String
}

impl<S: KeyValueStore> LocalLedgerStore<S> {
    pub fn new(store: S) -> LocalLedgerStore<S> {
        LocalLedgerStore::with_key(store, EXPENSES_KEY)
    }

    pub fn with_key(store: S, key: &str) -> LocalLedgerStore<S> {
        LocalLedgerStore { store, key: key.to_owned() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Same ledger behind a type-erased store.
    pub fn boxed(self) -> LocalLedgerStore<Box<dyn KeyValueStore + Send + Sync>>
    where
        S: Send + Sync + 'static
    {
        LocalLedgerStore { store: Box::new(self.store), key: self.key }
    }

    /// Adds `expense` at the end of the ledger.
    ///
    /// The new array is built completely before the single write is issued;
    /// a failed write leaves the stored ledger as it was. An unreadable blob
    /// is never overwritten.
    pub fn append(&self, expense: Expense) -> LedgerResult<()> {
        let mut ledger = self.load()?;
        ledger.push(expense);
        self.save(&ledger)?;
        debug!("appended expense, ledger now holds {}", ledger.len());
        return Ok(());
    }

    /// The full ledger in append order. Missing or unparsable data reads
    /// as an empty ledger. Single records that cannot be read, such as an
    /// amount outside the decimal range, are left out but stay stored.
    pub fn read_all(&self) -> Vec<Expense> {
        match self.load() {
            Ok(ledger) => ledger.into_expenses(),
            Err(err) => {
                warn!("{}; treating ledger as empty", err);
                Vec::new()
            }
        }
    }

    /// Removes the expense at `index` as ordered by [`read_all`](Self::read_all).
    /// An index past the end leaves the ledger untouched and is not an error.
    pub fn delete_at(&self, index: usize) -> LedgerResult<()> {
        let mut ledger = self.load()?;
        match ledger.remove_at(index) {
            Some(_) => self.save(&ledger),
            None => {
                warn!("ignoring delete of index {} on a ledger of {}", index, ledger.len());
                Ok(())
            }
        }
    }

    fn load(&self) -> LedgerResult<Ledger> {
        let raw = self.store.get(&self.key)
            .map_err(|err| LedgerError::StorageRead(err.to_string()))?;
        match raw {
            None => Ok(Ledger::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| LedgerError::StorageRead(format!("{} is not a valid ledger: {}", self.key, err)))
        }
    }

    fn save(&self, ledger: &Ledger) -> LedgerResult<()> {
        let serialised = serde_json::to_string(ledger)
            .map_err(|err| LedgerError::StorageWrite(err.to_string()))?;
        self.store.set(&self.key, &serialised).map_err(|err| {
            error!("failed to write {}: {}", self.key, err);
            LedgerError::StorageWrite(err.to_string())
        })
    }
}
