//! Expense query parameters.
//!
//! Request parameters arrive as loose strings. They are validated once into
//! an [`ExpenseQuery`], which the engine turns into a SQL condition (owner,
//! dates, category) plus an in-process search predicate and ordering.

use std::{cmp::Ordering, fmt};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{EngineError, Expense, ResultEngine};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sort keys accepted by the history endpoint (`sort_by`).
pub const HISTORY_SORT_FIELDS: &[SortField] = &[SortField::Date, SortField::Amount, SortField::Name];

/// Sort keys accepted by the plain listing endpoint (`ordering`).
pub const LIST_SORT_FIELDS: &[SortField] =
    &[SortField::Date, SortField::Amount, SortField::CreatedAt];

/// Raw, untrusted query parameters as received from a client.
///
/// Empty strings are treated like absent parameters.
#[derive(Clone, Debug, Default)]
pub struct ExpenseQueryParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Exact date match.
    pub date: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    /// `field` or `-field`; the listing endpoint also takes a comma list.
    pub sort_by: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Date,
    Amount,
    Name,
    CreatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(Self::Date),
            "amount" => Some(Self::Amount),
            "name" => Some(Self::Name),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

/// One sort key, `field` or `-field`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    fn parse(raw: &str, allowed: &[SortField]) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        SortField::parse(name)
            .filter(|field| allowed.contains(field))
            .map(|field| Self { field, descending })
    }

    fn compare(self, left: &Expense, right: &Expense) -> Ordering {
        let ordering = match self.field {
            SortField::Date => left.date.cmp(&right.date),
            SortField::Amount => left.amount.cmp(&right.amount),
            SortField::Name => left.name.cmp(&right.name),
            SortField::CreatedAt => left.created_at.cmp(&right.created_at),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.descending { "-" } else { "" };
        write!(f, "{sign}{}", self.field.as_str())
    }
}

/// Ordering of a query result: one or more keys, compared in turn.
///
/// Every ordering falls back to `created_at` descending and then `id`
/// descending, so results are deterministic when the keys tie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOrder {
    keys: Vec<SortKey>,
}

impl Default for SortOrder {
    /// Newest expense first.
    fn default() -> Self {
        Self::by(SortKey::desc(SortField::Date))
    }
}

impl SortOrder {
    pub fn by(key: SortKey) -> Self {
        Self { keys: vec![key] }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Parse a single `field` / `-field` against an allow-list.
    ///
    /// Anything not in `allowed` (including absent input) yields the default
    /// ordering; unknown values are never an error.
    pub fn parse_or_default(raw: Option<&str>, allowed: &[SortField]) -> Self {
        raw.and_then(|raw| SortKey::parse(raw, allowed))
            .map_or_else(Self::default, Self::by)
    }

    /// Parse a comma separated list such as `amount,-date`.
    ///
    /// Keys outside `allowed` are dropped; when none is left the default
    /// ordering applies.
    pub fn parse_list_or_default(raw: Option<&str>, allowed: &[SortField]) -> Self {
        let keys: Vec<SortKey> = raw
            .into_iter()
            .flat_map(|raw| raw.split(','))
            .filter_map(|part| SortKey::parse(part, allowed))
            .collect();
        if keys.is_empty() {
            Self::default()
        } else {
            Self { keys }
        }
    }

    pub fn compare(&self, left: &Expense, right: &Expense) -> Ordering {
        self.keys
            .iter()
            .fold(Ordering::Equal, |ordering, key| {
                ordering.then_with(|| key.compare(left, right))
            })
            .then_with(|| right.created_at.cmp(&left.created_at))
            .then_with(|| right.id.cmp(&left.id))
    }

    pub fn sort(&self, expenses: &mut [Expense]) {
        expenses.sort_by(|left, right| self.compare(left, right));
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, key) in self.keys.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Category restriction of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryFilter {
    Id(Uuid),
    /// The client sent something that can never match a category id.
    Unmatchable,
}

/// A validated expense query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseQuery {
    /// Inclusive lower bound.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub end_date: Option<NaiveDate>,
    pub on_date: Option<NaiveDate>,
    pub category: Option<CategoryFilter>,
    /// Lowercased search term.
    pub search: Option<String>,
    pub sort: SortOrder,
}

impl ExpenseQuery {
    /// Build a query for the history endpoint (`sort_by` over date, amount and
    /// name).
    pub fn history(params: &ExpenseQueryParams) -> ResultEngine<Self> {
        let sort = SortOrder::parse_or_default(params.sort_by.as_deref(), HISTORY_SORT_FIELDS);
        Self::parse(params, sort)
    }

    /// Build a query for the listing endpoint (`ordering` over date, amount
    /// and creation time, possibly several keys).
    pub fn listing(params: &ExpenseQueryParams) -> ResultEngine<Self> {
        let sort = SortOrder::parse_list_or_default(params.sort_by.as_deref(), LIST_SORT_FIELDS);
        Self::parse(params, sort)
    }

    fn parse(params: &ExpenseQueryParams, sort: SortOrder) -> ResultEngine<Self> {
        let start_date = parse_date(params.start_date.as_deref(), "start_date")?;
        let end_date = parse_date(params.end_date.as_deref(), "end_date")?;
        if let (Some(start), Some(end)) = (start_date, end_date)
            && start > end
        {
            return Err(EngineError::InvalidParameter(format!(
                "start_date {start} is after end_date {end}"
            )));
        }

        Ok(Self {
            start_date,
            end_date,
            on_date: parse_date(params.date.as_deref(), "date")?,
            category: non_blank(params.category.as_deref()).map(|raw| {
                Uuid::parse_str(raw).map_or(CategoryFilter::Unmatchable, CategoryFilter::Id)
            }),
            search: non_blank(params.search.as_deref()).map(str::to_lowercase),
            sort,
        })
    }

    /// `false` when the query can be answered with an empty result without
    /// touching storage.
    pub fn can_match(&self) -> bool {
        !matches!(self.category, Some(CategoryFilter::Unmatchable))
    }

    /// Case-insensitive substring match on name, description or category
    /// name.
    pub fn matches_search(&self, expense: &Expense) -> bool {
        let Some(term) = self.search.as_deref() else {
            return true;
        };
        expense.name.to_lowercase().contains(term)
            || expense
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(term))
            || expense.category_name.to_lowercase().contains(term)
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_date(raw: Option<&str>, label: &str) -> ResultEngine<Option<NaiveDate>> {
    non_blank(raw)
        .map(|value| {
            NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
                EngineError::InvalidParameter(format!(
                    "{label}: expected YYYY-MM-DD, got '{value}'"
                ))
            })
        })
        .transpose()
}
