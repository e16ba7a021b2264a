//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when an item is not found or not visible to the
//!   acting user.
//! - [`InvalidParameter`] thrown when a filter or input field is malformed.
//! - [`CategoryInUse`] thrown when deleting a category still referenced by
//!   expenses.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidParameter`]: EngineError::InvalidParameter
//!  [`CategoryInUse`]: EngineError::CategoryInUse
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid password: {0}")]
    InvalidPassword(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Category in use: {0}")]
    CategoryInUse(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidParameter(a), Self::InvalidParameter(b)) => a == b,
            (Self::InvalidPassword(a), Self::InvalidPassword(b)) => a == b,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::CategoryInUse(a), Self::CategoryInUse(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
