use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::error::{LedgerError, LedgerResult};
use crate::core::summary::format_amount;

pub type Amount = Decimal;

/// One entry on the ledger. Position in the ledger is its only handle.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Amount,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: DateTime<Utc>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl std::fmt::Display for Expense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}",
            self.date.format("%Y-%m-%d"),
            self.description_or_default().bold(),
            format_amount(self.amount))?;
        if let Some(category) = &self.category {
            write!(f, " [{}]", category)?;
        }
        if let Some(note) = &self.note {
            write!(f, " ({})", note.italic())?;
        }
        return Ok(());
    }
}

impl Expense {
    pub const DEFAULT_DESCRIPTION: &'static str = "Other";

    /// Largest amount accepted on entry, one billion. Far enough below
    /// `Amount::MAX` that sums over any realistic ledger stay in range.
    pub const MAX_AMOUNT: Amount = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

    pub fn new(description: &str, amount: Amount, date: DateTime<Utc>) -> Expense {
        Expense {
            description: description.to_owned(),
            amount,
            date,
            category: None,
            note: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Expense {
        self.category = Some(category.to_owned());
        self
    }

    pub fn with_note(mut self, note: &str) -> Expense {
        self.note = Some(note.to_owned());
        self
    }

    /// Builds a record from raw form input. Both fields are required and
    /// the amount must be a positive decimal number.
    pub fn from_form(description: &str, amount: &str, date: DateTime<Utc>) -> LedgerResult<Expense> {
        let description = description.trim();
        let amount = amount.trim();
        if description.is_empty() {
            return Err(LedgerError::InvalidExpense("description is required".to_owned()));
        }
        if amount.is_empty() {
            return Err(LedgerError::InvalidExpense("amount is required".to_owned()));
        }
        let amount = Decimal::from_str(amount)
            .map_err(|_| LedgerError::InvalidExpense(format!("not a number: {}", amount)))?;

        let expense = Expense::new(description, amount, date);
        expense.validate()?;
        return Ok(expense);
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidExpense(
                format!("amount must be positive, got {}", self.amount)));
        }
        if self.amount > Self::MAX_AMOUNT {
            return Err(LedgerError::InvalidExpense(
                format!("amount must not exceed {}, got {}", Self::MAX_AMOUNT, self.amount)));
        }
        return Ok(());
    }

    /// Grouping label used by the per-category summary.
    pub fn description_or_default(&self) -> &str {
        if self.description.is_empty() {
            Self::DEFAULT_DESCRIPTION
        } else {
            &self.description
        }
    }
}

/// Accepts an RFC 3339 timestamp with any offset, or a bare
/// `YYYY-MM-DD` date taken as midnight UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads a JSON number through its shortest decimal form. Numbers outside
/// the decimal range, and non-zero numbers too small to keep any digit,
/// are rejected rather than stored as something else.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>
{
    let raw = f64::deserialize(deserializer)?;
    let amount = Decimal::from_str(&raw.to_string())
        .map_err(|_| serde::de::Error::custom(format!("amount out of range: {}", raw)))?;
    if amount.is_zero() && raw != 0.0 {
        return Err(serde::de::Error::custom(format!("amount too small to represent: {:e}", raw)));
    }
    return Ok(amount);
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised date: {}", raw)))
}
