use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{Expense, LedgerError, LedgerResult};
use crate::remote::RemoteExpense;

/// A hosted collection of expense documents.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Stores `expense` as a new document and returns its generated id.
    async fn create_document(&self, expense: &Expense) -> LedgerResult<String>;

    /// Every document in the collection, each tagged with its id.
    async fn list_documents(&self) -> LedgerResult<Vec<RemoteExpense>>;
}

#[async_trait]
impl<C: DocumentCollection + ?Sized> DocumentCollection for Box<C> {
    async fn create_document(&self, expense: &Expense) -> LedgerResult<String> {
        (**self).create_document(expense).await
    }

    async fn list_documents(&self) -> LedgerResult<Vec<RemoteExpense>> {
        (**self).list_documents().await
    }
}

/// Collection kept in process memory. It can be switched into a failing
/// mode to stand in for an unreachable service.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    documents: Mutex<Vec<RemoteExpense>>,
    offline: bool
}

impl MemoryCollection {
    pub fn new() -> MemoryCollection {
        MemoryCollection::default()
    }

    /// Every call fails with a `RemoteOperation` error.
    pub fn offline() -> MemoryCollection {
        MemoryCollection { documents: Mutex::new(Vec::new()), offline: true }
    }

    fn check_online(&self) -> LedgerResult<()> {
        if self.offline {
            return Err(LedgerError::RemoteOperation("collection is offline".to_owned()));
        }
        return Ok(());
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, Vec<RemoteExpense>>> {
        self.documents.lock()
            .map_err(|_| LedgerError::RemoteOperation("collection lock poisoned".to_owned()))
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn create_document(&self, expense: &Expense) -> LedgerResult<String> {
        self.check_online()?;
        let mut documents = self.lock()?;
        let id = format!("doc-{}", documents.len() + 1);
        documents.push(RemoteExpense { id: id.clone(), expense: expense.clone() });
        return Ok(id);
    }

    async fn list_documents(&self) -> LedgerResult<Vec<RemoteExpense>> {
        self.check_online()?;
        Ok(self.lock()?.clone())
    }
}
