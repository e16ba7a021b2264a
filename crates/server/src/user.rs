//! Registration, login and profile endpoints.

use api_types::{
    auth::{AccessToken, LoginRequest, LoginResponse, RefreshRequest},
    user::{UserRegister, UserView},
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{RegisterUserCmd, User};

use crate::{ServerError, server::ServerState};

pub(crate) fn map_user(user: User) -> UserView {
    UserView {
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        date_joined: user.date_joined,
    }
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<UserRegister>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .register_user(RegisterUserCmd {
            username: payload.username,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password: payload.password,
            password_confirm: payload.password_confirm,
        })
        .await?;
    tracing::info!(username = %user.username, "user registered");

    Ok((StatusCode::CREATED, Json(map_user(user))))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let (user, tokens) = state
        .engine
        .login(&payload.username, &payload.password)
        .await
        .inspect_err(|_| tracing::warn!(username = %payload.username, "login failed"))?;

    Ok(Json(LoginResponse {
        access: tokens.access.token,
        access_expires_at: tokens.access.expires_at,
        refresh: tokens.refresh.token,
        refresh_expires_at: tokens.refresh.expires_at,
        user: map_user(user),
    }))
}

pub async fn refresh(
    State(state): State<ServerState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AccessToken>, ServerError> {
    let access = state.engine.refresh_access_token(&payload.refresh).await?;
    Ok(Json(AccessToken {
        access: access.token,
        access_expires_at: access.expires_at,
    }))
}

/// The authenticated user, as resolved by the auth middleware.
pub async fn profile(Extension(user): Extension<User>) -> Json<UserView> {
    Json(map_user(user))
}
