//! Read-only views over a ledger snapshot: the running total, the
//! per-month trend and the per-description breakdown used for charts.
//!
//! Everything here is a pure function of its input.

use chrono::{Datelike, TimeZone};
use log::warn;
use rust_decimal::RoundingStrategy;
use serde::Serialize;

use crate::core::expense::{Amount, Expense};

/// Slice colours for the per-category chart, assigned by first appearance.
pub const PALETTE: [&str; 7] = [
    "#f39c12",
    "#e74c3c",
    "#2ecc71",
    "#3498db",
    "#9b59b6",
    "#34495e",
    "#1abc9c",
];

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun",
    "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parallel label/amount series, one entry per distinct month in
/// first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MonthlySeries {
    pub labels: Vec<String>,
    pub amounts: Vec<Amount>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategorySlice {
    pub name: String,
    pub amount: Amount,
    pub color: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total: Amount,
    pub by_month: MonthlySeries,
    pub by_category: Vec<CategorySlice>,
    /// Set when some sum ran past the representable range and was pinned
    /// to the nearest bound.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub saturated: bool,
}

impl Summary {
    pub fn of<Tz: TimeZone>(expenses: &[Expense], tz: &Tz) -> Summary {
        let (total, total_saturated) = checked_total(expenses);
        let (by_month, months_saturated) = checked_by_month(expenses, tz);
        let (by_category, categories_saturated) = checked_by_category(expenses);
        Summary {
            total,
            by_month,
            by_category,
            saturated: total_saturated || months_saturated || categories_saturated,
        }
    }
}

/// Adds `amount` into `sum`, pinning to `Amount::MAX` or `Amount::MIN`
/// instead of overflowing. Returns whether it had to pin.
fn accumulate(sum: &mut Amount, amount: Amount) -> bool {
    match sum.checked_add(amount) {
        Some(next) => {
            *sum = next;
            false
        },
        None => {
            warn!("sum of {} and {} is out of range, saturating", sum, amount);
            *sum = if amount.is_sign_negative() { Amount::MIN } else { Amount::MAX };
            true
        }
    }
}

/// Exact sum of all amounts; zero for an empty slice. A sum that does not
/// fit saturates, see [`Summary::saturated`].
pub fn total(expenses: &[Expense]) -> Amount {
    checked_total(expenses).0
}

fn checked_total(expenses: &[Expense]) -> (Amount, bool) {
    let mut sum = Amount::ZERO;
    let mut saturated = false;
    for expense in expenses {
        saturated |= accumulate(&mut sum, expense.amount);
    }
    (sum, saturated)
}

/// Groups amounts by the short month name of each date as seen in `tz`.
///
/// Labels keep the order in which each month is first met while scanning
/// front to back, not calendar order. The year is not part of the key.
pub fn by_month<Tz: TimeZone>(expenses: &[Expense], tz: &Tz) -> MonthlySeries {
    checked_by_month(expenses, tz).0
}

fn checked_by_month<Tz: TimeZone>(expenses: &[Expense], tz: &Tz) -> (MonthlySeries, bool) {
    let mut series = MonthlySeries::default();
    let mut saturated = false;

    for expense in expenses {
        let label = MONTH_LABELS[expense.date.with_timezone(tz).month0() as usize];
        match series.labels.iter().position(|seen| seen == label) {
            Some(pos) => saturated |= accumulate(&mut series.amounts[pos], expense.amount),
            None => {
                series.labels.push(label.to_owned());
                series.amounts.push(expense.amount);
            }
        }
    }
    (series, saturated)
}

/// Groups amounts by description, with an empty description counted
/// under "Other". Colours cycle through [`PALETTE`] by group order.
pub fn by_category(expenses: &[Expense]) -> Vec<CategorySlice> {
    checked_by_category(expenses).0
}

fn checked_by_category(expenses: &[Expense]) -> (Vec<CategorySlice>, bool) {
    let mut slices: Vec<CategorySlice> = Vec::new();
    let mut saturated = false;

    for expense in expenses {
        let name = expense.description_or_default();
        match slices.iter_mut().find(|slice| slice.name == name) {
            Some(slice) => saturated |= accumulate(&mut slice.amount, expense.amount),
            None => {
                let color = PALETTE[slices.len() % PALETTE.len()];
                slices.push(CategorySlice { name: name.to_owned(), amount: expense.amount, color });
            }
        }
    }
    (slices, saturated)
}

/// Dollar amount with two fraction digits. Rounding happens here only.
pub fn format_amount(amount: Amount) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${:.2}", rounded)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expense::parse_date;

    use chrono::{FixedOffset, Utc};
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn expense(description: &str, amount: &str, date: &str) -> Expense {
        Expense::new(description, Decimal::from_str(amount).unwrap(), parse_date(date).unwrap())
    }

    #[fixture]
    fn coffees() -> Vec<Expense> {
        vec![
            expense("Coffee", "4.50", "2024-01-05"),
            expense("Coffee", "3.25", "2024-02-10"),
        ]
    }

    #[rstest]
    fn coffee_scenario(coffees: Vec<Expense>) {
        assert_eq!(total(&coffees), Decimal::from_str("7.75").unwrap());

        let months = by_month(&coffees, &Utc);
        assert_eq!(months.labels, vec!["Jan", "Feb"]);
        assert_eq!(months.amounts, vec![Decimal::from_str("4.50").unwrap(), Decimal::from_str("3.25").unwrap()]);

        let slices = by_category(&coffees);
        assert_eq!(slices, vec![CategorySlice {
            name: "Coffee".to_owned(),
            amount: Decimal::from_str("7.75").unwrap(),
            color: PALETTE[0],
        }]);
    }

    #[test]
    fn total_of_empty_is_zero() {
        assert_eq!(total(&[]), Decimal::ZERO);
    }

    #[test]
    fn total_is_exact() {
        let expenses: Vec<Expense> = (0..10)
            .map(|_| expense("Gum", "0.1", "2024-01-01"))
            .chain(std::iter::once(expense("Gum", "0.2", "2024-01-01")))
            .collect();
        assert_eq!(total(&expenses), Decimal::from_str("1.2").unwrap());
    }

    #[test]
    fn months_keep_first_seen_order() {
        let expenses = vec![
            expense("a", "1", "2024-03-01"),
            expense("b", "2", "2024-01-15"),
            expense("c", "4", "2024-03-20"),
            expense("d", "8", "2023-12-31"),
            expense("e", "16", "2024-01-02"),
        ];
        let months = by_month(&expenses, &Utc);
        assert_eq!(months.labels, vec!["Mar", "Jan", "Dec"]);
        assert_eq!(months.amounts, vec![Decimal::new(5, 0), Decimal::new(18, 0), Decimal::new(8, 0)]);
    }

    #[test]
    fn months_ignore_year() {
        let expenses = vec![
            expense("a", "1", "2023-01-10"),
            expense("b", "2", "2024-01-10"),
        ];
        let months = by_month(&expenses, &Utc);
        assert_eq!(months.labels, vec!["Jan"]);
        assert_eq!(months.amounts, vec![Decimal::new(3, 0)]);
    }

    #[test]
    fn months_follow_display_offset() {
        let expenses = vec![expense("late", "1", "2024-01-31T23:30:00Z")];
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(by_month(&expenses, &Utc).labels, vec!["Jan"]);
        assert_eq!(by_month(&expenses, &east).labels, vec!["Feb"]);
    }

    #[test]
    fn categories_cycle_palette() {
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "a"];
        let expenses: Vec<Expense> = names.iter()
            .map(|name| expense(name, "1", "2024-01-01"))
            .collect();

        let slices = by_category(&expenses);

        assert_eq!(slices.len(), 9);
        assert_eq!(slices[0].amount, Decimal::new(2, 0));
        for (index, slice) in slices.iter().enumerate() {
            assert_eq!(slice.color, PALETTE[index % 7]);
        }
        assert_eq!(slices[7].color, slices[0].color);
    }

    #[test]
    fn empty_description_counts_as_other() {
        let expenses = vec![
            expense("", "2", "2024-01-01"),
            expense("Other", "3", "2024-01-01"),
            expense("Taxi", "1", "2024-01-01"),
        ];
        let slices = by_category(&expenses);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].name, "Other");
        assert_eq!(slices[0].amount, Decimal::new(5, 0));
        assert_eq!(slices[1].color, PALETTE[1]);
    }

    #[rstest]
    fn aggregation_is_deterministic(coffees: Vec<Expense>) {
        assert_eq!(Summary::of(&coffees, &Utc), Summary::of(&coffees, &Utc));
    }

    fn huge_pair() -> Vec<Expense> {
        vec![
            expense("Yacht", "50000000000000000000000000000", "2024-01-05"),
            expense("Yacht", "50000000000000000000000000000", "2024-01-06"),
        ]
    }

    #[test]
    fn oversized_sums_saturate() {
        let expenses = huge_pair();

        assert_eq!(total(&expenses), Decimal::MAX);
        assert_eq!(by_month(&expenses, &Utc).amounts, vec![Decimal::MAX]);
        assert_eq!(by_category(&expenses)[0].amount, Decimal::MAX);

        let summary = Summary::of(&expenses, &Utc);
        assert!(summary.saturated);
        assert_eq!(serde_json::to_value(&summary).unwrap()["saturated"], true);
    }

    #[test]
    fn negative_overflow_saturates_low() {
        let expenses = vec![
            expense("Refund", "-50000000000000000000000000000", "2024-01-05"),
            expense("Refund", "-50000000000000000000000000000", "2024-01-06"),
        ];
        assert_eq!(total(&expenses), Decimal::MIN);
        assert!(Summary::of(&expenses, &Utc).saturated);
    }

    #[rstest]
    fn in_range_summary_is_not_saturated(coffees: Vec<Expense>) {
        assert!(!Summary::of(&coffees, &Utc).saturated);
    }

    #[rstest]
    #[case("7.75", "$7.75")]
    #[case("4.5", "$4.50")]
    #[case("0.005", "$0.01")]
    #[case("1234", "$1234.00")]
    #[case("2.344", "$2.34")]
    fn formats_two_digits(#[case] amount: &str, #[case] expected: &str) {
        assert_eq!(format_amount(Decimal::from_str(amount).unwrap()), expected);
    }

    #[rstest]
    fn summary_serialize(coffees: Vec<Expense>) {
        let summary = Summary::of(&coffees, &Utc);
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value, serde_json::json!({
            "total": 7.75,
            "by_month": {"labels": ["Jan", "Feb"], "amounts": [4.5, 3.25]},
            "by_category": [{"name": "Coffee", "amount": 7.75, "color": "#f39c12"}]
        }));
    }
}
