//! Domain engine for expense tracking.
//!
//! The [`Engine`] owns the database connection and exposes every operation
//! with the acting user passed explicitly. Expense listing goes through
//! [`ExpenseQuery`]; statistics through [`ExpenseStats`].

pub use auth_tokens::TokenKind;
pub use categories::Category;
pub use error::EngineError;
pub use expenses::Expense;
pub use money::Money;
pub use ops::{
    CategoryPatch, DEFAULT_CATEGORIES, Engine, EngineBuilder, ExpenseDraft, ExpensePatch,
    IssuedToken, RegisterUserCmd, TokenPair,
};
pub use password::{MIN_PASSWORD_LENGTH, PasswordHash, ValidatedPassword};
pub use query::{
    CategoryFilter, ExpenseQuery, ExpenseQueryParams, HISTORY_SORT_FIELDS, LIST_SORT_FIELDS,
    SortField, SortKey, SortOrder,
};
pub use stats::{CategoryStats, ExpenseStats};
pub use users::User;

mod auth_tokens;
mod categories;
mod error;
mod expenses;
mod money;
mod ops;
mod password;
mod query;
mod stats;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
