//! Statistics API endpoints

use api_types::stats::{CategoryStatsView, ExpenseStatsView};
use axum::{Extension, Json, extract::State};
use engine::{ExpenseStats, User};

use crate::{ServerError, server::ServerState};

fn map_stats(stats: ExpenseStats) -> ExpenseStatsView {
    ExpenseStatsView {
        total_count: stats.total_count,
        total_amount: stats.total_amount.to_string(),
        categories: stats
            .categories
            .into_iter()
            .map(|(name, bucket)| {
                (
                    name,
                    CategoryStatsView {
                        count: bucket.count,
                        amount: bucket.amount.to_string(),
                    },
                )
            })
            .collect(),
    }
}

/// Totals over every expense of the user. History filters do not apply.
pub async fn get_stats(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<ExpenseStatsView>, ServerError> {
    let stats = state.engine.expense_stats(&user.username).await?;
    Ok(Json(map_stats(stats)))
}
