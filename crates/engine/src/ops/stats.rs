use crate::{ExpenseStats, ResultEngine};

use super::Engine;

impl Engine {
    /// Per-category totals over every expense of `user_id`.
    pub async fn expense_stats(&self, user_id: &str) -> ResultEngine<ExpenseStats> {
        let expenses = self.all_expenses(user_id).await?;
        Ok(ExpenseStats::aggregate(&expenses))
    }
}
