//! Expense API endpoints.
//!
//! Every handler works on the expenses of the authenticated user only.

use api_types::expense::{
    ExpenseHistoryQuery, ExpenseListQuery, ExpenseNew, ExpenseSummary, ExpenseUpdate, ExpenseView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{
    Expense, ExpenseDraft, ExpensePatch, ExpenseQuery, ExpenseQueryParams, Money, User,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_summary(expense: Expense) -> ExpenseSummary {
    ExpenseSummary {
        id: expense.id,
        name: expense.name,
        amount: expense.amount.to_string(),
        date: expense.date,
        category_name: expense.category_name,
        created_at: expense.created_at,
    }
}

fn map_expense(expense: Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        name: expense.name,
        description: expense.description,
        amount: expense.amount.to_string(),
        date: expense.date,
        category: expense.category_id,
        category_name: expense.category_name,
        user: expense.user_id,
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

fn parse_amount(raw: &str) -> Result<Money, ServerError> {
    Ok(raw.parse::<Money>()?)
}

fn history_params(query: ExpenseHistoryQuery) -> ExpenseQueryParams {
    ExpenseQueryParams {
        start_date: query.start_date,
        end_date: query.end_date,
        date: None,
        category: query.category,
        search: query.search,
        sort_by: query.sort_by,
    }
}

fn list_params(query: ExpenseListQuery) -> ExpenseQueryParams {
    ExpenseQueryParams {
        start_date: None,
        end_date: None,
        date: query.date,
        category: query.category,
        search: query.search,
        sort_by: query.ordering,
    }
}

async fn run_query(
    state: &ServerState,
    user: &User,
    query: ExpenseQuery,
) -> Result<Json<Vec<ExpenseSummary>>, ServerError> {
    let expenses = state.engine.list_expenses(&user.username, &query).await?;
    tracing::debug!(
        username = %user.username,
        sort = %query.sort,
        rows = expenses.len(),
        "expense query"
    );
    Ok(Json(expenses.into_iter().map(map_summary).collect()))
}

/// `GET /expenses/history`: date range, category, search and `sort_by`.
pub async fn history(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<ExpenseHistoryQuery>,
) -> Result<Json<Vec<ExpenseSummary>>, ServerError> {
    let query = ExpenseQuery::history(&history_params(query))?;
    run_query(&state, &user, query).await
}

/// `GET /expenses`: exact category and date, search and `ordering`.
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<Vec<ExpenseSummary>>, ServerError> {
    let query = ExpenseQuery::listing(&list_params(query))?;
    run_query(&state, &user, query).await
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.expense(&user.username, expense_id).await?;
    Ok(Json(map_expense(expense)))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let draft = ExpenseDraft {
        name: payload.name,
        description: payload.description,
        amount: parse_amount(&payload.amount)?,
        date: payload.date,
        category_id: payload.category,
    };
    let expense = state.engine.create_expense(&user.username, draft).await?;
    tracing::info!(
        username = %user.username,
        expense_id = %expense.id,
        amount = %expense.amount,
        "expense created"
    );
    Ok((StatusCode::CREATED, Json(map_expense(expense))))
}

/// `PUT`: every field is replaced, a missing description clears it.
pub async fn replace(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseView>, ServerError> {
    let patch = ExpensePatch {
        name: Some(payload.name),
        description: Some(payload.description),
        amount: Some(parse_amount(&payload.amount)?),
        date: Some(payload.date),
        category_id: Some(payload.category),
    };
    let expense = state
        .engine
        .update_expense(&user.username, expense_id, patch)
        .await?;
    Ok(Json(map_expense(expense)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseView>, ServerError> {
    let patch = ExpensePatch {
        name: payload.name,
        description: payload.description,
        amount: payload.amount.as_deref().map(parse_amount).transpose()?,
        date: payload.date,
        category_id: payload.category,
    };
    let expense = state
        .engine
        .update_expense(&user.username, expense_id, patch)
        .await?;
    Ok(Json(map_expense(expense)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(&user.username, expense_id).await?;
    tracing::info!(username = %user.username, %expense_id, "expense deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_query_ignores_exact_date() {
        let params = history_params(ExpenseHistoryQuery {
            start_date: Some("2024-01-01".to_string()),
            sort_by: Some("-amount".to_string()),
            ..ExpenseHistoryQuery::default()
        });
        assert_eq!(params.date, None);
        assert_eq!(params.sort_by.as_deref(), Some("-amount"));
    }

    #[test]
    fn list_query_maps_ordering() {
        let params = list_params(ExpenseListQuery {
            date: Some("2024-01-01".to_string()),
            ordering: Some("created_at".to_string()),
            ..ExpenseListQuery::default()
        });
        assert_eq!(params.start_date, None);
        assert_eq!(params.date.as_deref(), Some("2024-01-01"));
        assert_eq!(params.sort_by.as_deref(), Some("created_at"));
    }

    #[test]
    fn amounts_are_rendered_with_two_decimals() {
        assert_eq!(parse_amount("12.5").unwrap().to_string(), "12.50");
        assert!(parse_amount("twelve").is_err());
    }
}
