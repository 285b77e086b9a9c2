//! Best-effort copy of expenses in a hosted document collection.
//!
//! Nothing here is kept consistent with the local ledger: deletes never
//! reach the remote side and aggregation never reads from it. Failures are
//! logged and swallowed so callers never see them.

mod collection;
mod firestore;

use log::{error, info};
use serde::{Serialize, Deserialize};

use crate::core::Expense;

pub use collection::{DocumentCollection, MemoryCollection};
pub use firestore::FirestoreCollection;

/// A remote document: the expense fields plus the id the service assigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteExpense {
    pub id: String,
    #[serde(flatten)]
    pub expense: Expense,
}

pub struct RemoteLedgerStore<C: DocumentCollection> {
    collection: C
}

impl<C: DocumentCollection> RemoteLedgerStore<C> {
    pub fn new(collection: C) -> RemoteLedgerStore<C> {
        RemoteLedgerStore { collection }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Creates a remote document for `expense`. Returns the new id, or
    /// `None` after logging if the service could not be reached.
    pub async fn save_remote(&self, expense: &Expense) -> Option<String> {
        match self.collection.create_document(expense).await {
            Ok(id) => {
                info!("expense added remotely with id {}", id);
                Some(id)
            },
            Err(err) => {
                error!("error adding expense remotely: {}", err);
                None
            }
        }
    }

    /// All remote documents, or an empty list after logging on failure.
    pub async fn read_all_remote(&self) -> Vec<RemoteExpense> {
        match self.collection.list_documents().await {
            Ok(documents) => documents,
            Err(err) => {
                error!("error fetching remote expenses: {}", err);
                Vec::new()
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{MemoryCollection, RemoteExpense, RemoteLedgerStore};
    use crate::core::Expense;
    use crate::core::expense::parse_date;

    use rust_decimal::Decimal;
    use serde_json::json;

    fn coffee() -> Expense {
        Expense::new("Coffee", Decimal::new(450, 2), parse_date("2024-01-05").unwrap())
    }

    #[tokio::test]
    async fn save_then_read() {
        let remote = RemoteLedgerStore::new(MemoryCollection::new());

        let first = remote.save_remote(&coffee()).await;
        let second = remote.save_remote(&coffee().with_note("refill")).await;

        assert_eq!(first.as_deref(), Some("doc-1"));
        assert_eq!(second.as_deref(), Some("doc-2"));

        let documents = remote.read_all_remote().await;
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0], RemoteExpense { id: "doc-1".to_owned(), expense: coffee() });
        assert_eq!(documents[1].expense.note.as_deref(), Some("refill"));
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let remote = RemoteLedgerStore::new(MemoryCollection::offline());

        assert_eq!(remote.save_remote(&coffee()).await, None);
        assert!(remote.read_all_remote().await.is_empty());
    }

    #[tokio::test]
    async fn empty_collection_reads_empty() {
        let remote = RemoteLedgerStore::new(MemoryCollection::new());
        assert!(remote.read_all_remote().await.is_empty());
    }

    #[test]
    fn remote_expense_serialize_flat() {
        let doc = RemoteExpense { id: "abc".to_owned(), expense: coffee() };
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({
            "id": "abc",
            "description": "Coffee",
            "amount": 4.5,
            "date": "2024-01-05T00:00:00Z"
        }));
    }
}
