//! Password validation and hashing.
//!
//! `ValidatedPassword` wraps a string that passed the password rules.
//! `PasswordHash` converts a `ValidatedPassword` into a salted bcrypt hash.

use std::fmt::Display;

use bcrypt::{hash, verify};

use crate::{EngineError, ResultEngine};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A password that has been validated, but not yet hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Validate a new password.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPassword`] if the password is shorter than
    /// [`MIN_PASSWORD_LENGTH`] characters or differs from `confirmation`.
    pub fn new(raw_password: &str, confirmation: &str) -> ResultEngine<Self> {
        if raw_password != confirmation {
            return Err(EngineError::InvalidPassword(
                "passwords don't match".to_string(),
            ));
        }
        if raw_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(EngineError::InvalidPassword(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        Ok(Self(raw_password.to_string()))
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default bcrypt cost.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash a validated password with the given bcrypt `cost`.
    pub fn new(password: &ValidatedPassword, cost: u32) -> ResultEngine<Self> {
        hash(&password.0, cost)
            .map(Self)
            .map_err(|err| EngineError::InvalidPassword(format!("could not hash password: {err}")))
    }

    /// Wrap a hash loaded from storage.
    pub fn from_stored(raw_hash: String) -> Self {
        Self(raw_hash)
    }

    /// Check that `raw_password` matches the stored hash.
    ///
    /// A malformed stored hash counts as a mismatch.
    pub fn verify(&self, raw_password: &str) -> bool {
        verify(raw_password, &self.0).unwrap_or(false)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
