//! Categories API endpoints.
//!
//! Categories are shared by every user; any authenticated user may manage
//! them.

use api_types::category::{CategoryNew, CategoryUpdate, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{CategoryPatch, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        description: category.description,
        created_at: category.created_at,
        updated_at: category.updated_at,
    }
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state
        .engine
        .list_categories()
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(Json(categories))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state.engine.category(category_id).await?;
    Ok(Json(map_category(category)))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(&payload.name, payload.description.as_deref())
        .await?;
    tracing::info!(
        username = %user.username,
        category = %category.name,
        "category created"
    );
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

/// `PUT`: every field is replaced, a missing description clears it.
pub async fn replace(
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CategoryNew>,
) -> Result<Json<CategoryView>, ServerError> {
    let patch = CategoryPatch {
        name: Some(payload.name),
        description: Some(payload.description),
    };
    let category = state.engine.update_category(category_id, patch).await?;
    Ok(Json(map_category(category)))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    if payload.name.is_none() && payload.description.is_none() {
        return Err(ServerError::Generic(
            "provide at least one of name or description".to_string(),
        ));
    }

    let patch = CategoryPatch {
        name: payload.name,
        description: payload.description,
    };
    let category = state.engine.update_category(category_id, patch).await?;
    Ok(Json(map_category(category)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(category_id).await?;
    tracing::info!(username = %user.username, %category_id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
