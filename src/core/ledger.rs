use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::core::expense::Expense;

/// One element of the stored array. Elements that do not read as an
/// [`Expense`] are carried verbatim so that rewriting the ledger keeps them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
enum Entry {
    Readable(Expense),
    Unreadable(Value)
}

/// Ordered sequence of expenses, append order preserved.
///
/// Serialises as a bare JSON array, which is the on-disk form of the
/// ledger blob. Indices count readable expenses only.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<Entry>
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger { entries: Vec::new() }
    }

    pub fn push(&mut self, expense: Expense) {
        self.entries.push(Entry::Readable(expense));
    }

    /// Removes the expense at `index`, keeping the relative order of the
    /// rest. Returns `None` and leaves the ledger untouched when `index`
    /// is out of range.
    pub fn remove_at(&mut self, index: usize) -> Option<Expense> {
        let position = self.entries.iter()
            .enumerate()
            .filter(|(_, entry)| matches!(entry, Entry::Readable(_)))
            .nth(index)
            .map(|(position, _)| position)?;
        match self.entries.remove(position) {
            Entry::Readable(expense) => Some(expense),
            Entry::Unreadable(_) => None
        }
    }

    pub fn get_expenses(&self) -> impl Iterator<Item = &Expense> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Readable(expense) => Some(expense),
            Entry::Unreadable(_) => None
        })
    }

    /// Number of readable expenses.
    pub fn len(&self) -> usize {
        self.get_expenses().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored elements kept aside because they did not read as
    /// an expense.
    pub fn unreadable(&self) -> usize {
        self.entries.len() - self.len()
    }

    pub fn into_expenses(self) -> Vec<Expense> {
        self.entries.into_iter().filter_map(|entry| match entry {
            Entry::Readable(expense) => Some(expense),
            Entry::Unreadable(_) => None
        }).collect()
    }
}

impl From<Vec<Expense>> for Ledger {
    fn from(expenses: Vec<Expense>) -> Self {
        Ledger { entries: expenses.into_iter().map(Entry::Readable).collect() }
    }
}

impl<'de> Deserialize<'de> for Ledger {
    /// The blob has to be an array; each element is read on its own.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<Value>::deserialize(deserializer)?;
        let entries = values.into_iter().enumerate().map(|(position, value)| {
            match Expense::deserialize(&value) {
                Ok(expense) => Entry::Readable(expense),
                Err(err) => {
                    warn!("skipping unreadable expense at position {}: {}", position, err);
                    Entry::Unreadable(value)
                }
            }
        }).collect();
        return Ok(Ledger { entries });
    }
}
