//! Expense statistics.
//!
//! Statistics always cover every expense of a user; they are not affected by
//! the filters of the history listing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Expense, Money};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: u64,
    pub amount: Money,
}

/// Totals for one user, grouped by category display name.
///
/// Two categories sharing a display name end up in the same bucket. Only
/// categories that have at least one expense appear in `categories`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseStats {
    pub total_count: u64,
    pub total_amount: Money,
    pub categories: BTreeMap<String, CategoryStats>,
}

impl ExpenseStats {
    /// Reduce a set of expenses in a single pass.
    pub fn aggregate<'a, I>(expenses: I) -> Self
    where
        I: IntoIterator<Item = &'a Expense>,
    {
        expenses.into_iter().fold(Self::default(), |mut stats, expense| {
            stats.record(&expense.category_name, expense.amount);
            stats
        })
    }

    fn record(&mut self, category_name: &str, amount: Money) {
        self.total_count += 1;
        self.total_amount += amount;

        let bucket = self
            .categories
            .entry(category_name.to_string())
            .or_default();
        bucket.count += 1;
        bucket.amount += amount;
    }
}
