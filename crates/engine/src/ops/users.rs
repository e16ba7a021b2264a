use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use sha2::{Digest, Sha256};

use crate::{
    EngineError, PasswordHash, ResultEngine, TokenKind, User, ValidatedPassword, auth_tokens,
    users,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

/// Input for registering a new user.
#[derive(Clone, Debug)]
pub struct RegisterUserCmd {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

/// A bearer token in clear text, as handed to the client once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

const TOKEN_BYTES: usize = 32;

/// 256 random bits from the OS, URL-safe.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn validate_email(raw: &str) -> ResultEngine<String> {
    let email = raw.trim();
    if !email.is_empty() && !email.contains('@') {
        return Err(EngineError::InvalidParameter(format!(
            "invalid email address: {email}"
        )));
    }
    Ok(email.to_string())
}

impl Engine {
    /// Register a user. The password is stored as a bcrypt hash.
    pub async fn register_user(&self, cmd: RegisterUserCmd) -> ResultEngine<User> {
        let username = normalize_required_name(&cmd.username, "user")?;
        let email = validate_email(&cmd.email)?;
        let password = ValidatedPassword::new(&cmd.password, &cmd.password_confirm)?;
        let password_hash = PasswordHash::new(&password, self.password_cost)?;

        with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username));
            }

            let model = users::ActiveModel {
                username: ActiveValue::Set(username),
                email: ActiveValue::Set(email),
                first_name: ActiveValue::Set(normalize_optional_text(cmd.first_name.as_deref())),
                last_name: ActiveValue::Set(normalize_optional_text(cmd.last_name.as_deref())),
                password_hash: ActiveValue::Set(password_hash.as_str().to_string()),
                date_joined: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            Ok(User::from(model))
        })
    }

    /// Returns the profile of `username`.
    pub async fn user(&self, username: &str) -> ResultEngine<User> {
        users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Check a username/password pair.
    ///
    /// Unknown users and wrong passwords produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;

        if !PasswordHash::from_stored(model.password_hash.clone()).verify(password) {
            return Err(EngineError::InvalidCredentials);
        }
        Ok(User::from(model))
    }

    /// Authenticate and issue a fresh access/refresh token pair.
    pub async fn login(&self, username: &str, password: &str) -> ResultEngine<(User, TokenPair)> {
        let user = self.authenticate(username, password).await?;
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            auth_tokens::Entity::delete_many()
                .filter(auth_tokens::Column::Username.eq(user.username.clone()))
                .filter(auth_tokens::Column::ExpiresAt.lte(now))
                .exec(&db_tx)
                .await?;

            let access = self
                .insert_token(&db_tx, &user.username, TokenKind::Access, now)
                .await?;
            let refresh = self
                .insert_token(&db_tx, &user.username, TokenKind::Refresh, now)
                .await?;

            Ok((user, TokenPair { access, refresh }))
        })
    }

    /// Exchange a valid refresh token for a new access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ResultEngine<IssuedToken> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = Self::live_token(&db_tx, refresh_token, TokenKind::Refresh, now).await?;
            self.insert_token(&db_tx, &model.username, TokenKind::Access, now)
                .await
        })
    }

    /// Resolve the user owning a live access token.
    pub async fn user_for_access_token(&self, access_token: &str) -> ResultEngine<User> {
        let now = Utc::now();
        let (token, user) = auth_tokens::Entity::find_by_id(token_digest(access_token))
            .find_also_related(users::Entity)
            .one(&self.database)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;

        if TokenKind::try_from(token.kind.as_str())? != TokenKind::Access || token.expires_at <= now
        {
            return Err(EngineError::InvalidCredentials);
        }
        user.map(User::from).ok_or(EngineError::InvalidCredentials)
    }

    async fn live_token<C: ConnectionTrait>(
        db: &C,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> ResultEngine<auth_tokens::Model> {
        let model = auth_tokens::Entity::find_by_id(token_digest(token))
            .one(db)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;
        if TokenKind::try_from(model.kind.as_str())? != kind || model.expires_at <= now {
            return Err(EngineError::InvalidCredentials);
        }
        Ok(model)
    }

    async fn insert_token<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> ResultEngine<IssuedToken> {
        let ttl = match kind {
            TokenKind::Access => self.access_token_ttl,
            TokenKind::Refresh => self.refresh_token_ttl,
        };
        let token = generate_token();
        let expires_at = now + ttl;

        auth_tokens::ActiveModel {
            token_hash: ActiveValue::Set(token_digest(&token)),
            username: ActiveValue::Set(username.to_string()),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            expires_at: ActiveValue::Set(expires_at),
            created_at: ActiveValue::Set(now),
        }
        .insert(db)
        .await?;

        Ok(IssuedToken { token, expires_at })
    }
}
