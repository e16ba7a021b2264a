use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::{PasswordHash, ResultEngine};

mod categories;
mod expenses;
mod stats;
mod users;

pub use categories::{CategoryPatch, DEFAULT_CATEGORIES};
pub use expenses::{ExpenseDraft, ExpensePatch};
pub use users::{IssuedToken, RegisterUserCmd, TokenPair};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 60;
const DEFAULT_REFRESH_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    password_cost: u32,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    password_cost: u32,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            password_cost: PasswordHash::DEFAULT_COST,
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            refresh_token_ttl: Duration::hours(DEFAULT_REFRESH_TOKEN_TTL_HOURS),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// bcrypt cost used when hashing new passwords.
    pub fn password_cost(mut self, cost: u32) -> EngineBuilder {
        self.password_cost = cost;
        self
    }

    /// Lifetime of access tokens issued at login or refresh.
    pub fn access_token_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.access_token_ttl = ttl;
        self
    }

    /// Lifetime of refresh tokens issued at login.
    pub fn refresh_token_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            password_cost: self.password_cost,
            access_token_ttl: self.access_token_ttl,
            refresh_token_ttl: self.refresh_token_ttl,
        })
    }
}
