use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CategoryFilter, EngineError, Expense, ExpenseQuery, Money, ResultEngine, categories, expenses,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

/// Input for creating an expense. The owner is never part of the draft.
#[derive(Clone, Debug)]
pub struct ExpenseDraft {
    pub name: String,
    pub description: Option<String>,
    pub amount: Money,
    pub date: NaiveDate,
    pub category_id: Uuid,
}

/// Partial update of an expense.
///
/// `description: Some(None)` clears the description; `None` leaves it as is.
#[derive(Clone, Debug, Default)]
pub struct ExpensePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

fn validate_amount(amount: Money) -> ResultEngine<Money> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        ));
    }
    if !amount.is_valid_expense_amount() {
        return Err(EngineError::InvalidAmount(format!(
            "amount must be <= {}",
            Money::MAX_AMOUNT
        )));
    }
    Ok(amount)
}

trait ApplyExpenseFilters: QueryFilter + Sized {
    fn apply_expense_filters(self, query: &ExpenseQuery) -> Self;
}

impl<T> ApplyExpenseFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_expense_filters(mut self, query: &ExpenseQuery) -> Self {
        if let Some(start) = query.start_date {
            self = self.filter(expenses::Column::Date.gte(start));
        }
        if let Some(end) = query.end_date {
            self = self.filter(expenses::Column::Date.lte(end));
        }
        if let Some(date) = query.on_date {
            self = self.filter(expenses::Column::Date.eq(date));
        }
        if let Some(CategoryFilter::Id(category_id)) = query.category {
            self = self.filter(expenses::Column::CategoryId.eq(category_id));
        }
        self
    }
}

impl Engine {
    /// Expenses of `user_id` matching `query`, in the order it asks for.
    ///
    /// The owner, date and category restrictions run in SQL; search and
    /// ordering run here so both use full Unicode case folding and the same
    /// tiebreak rules regardless of the database collation.
    pub async fn list_expenses(
        &self,
        user_id: &str,
        query: &ExpenseQuery,
    ) -> ResultEngine<Vec<Expense>> {
        if !query.can_match() {
            return Ok(Vec::new());
        }

        let rows = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .apply_expense_filters(query)
            .find_also_related(categories::Entity)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (model, category) in rows {
            let category = category
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
            let expense = Expense::from_models(model, &category);
            if query.matches_search(&expense) {
                out.push(expense);
            }
        }
        query.sort.sort(&mut out);
        Ok(out)
    }

    /// Every expense of `user_id`, unfiltered and unordered.
    pub(super) async fn all_expenses(&self, user_id: &str) -> ResultEngine<Vec<Expense>> {
        expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .find_also_related(categories::Entity)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|(model, category)| {
                category
                    .map(|category| Expense::from_models(model, &category))
                    .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
            })
            .collect()
    }

    /// Returns one expense of `user_id`.
    ///
    /// Another user's expense is reported exactly like a missing one.
    pub async fn expense(&self, user_id: &str, expense_id: Uuid) -> ResultEngine<Expense> {
        Self::owned_expense(&self.database, user_id, expense_id).await
    }

    /// Record a new expense owned by `user_id`.
    pub async fn create_expense(&self, user_id: &str, draft: ExpenseDraft) -> ResultEngine<Expense> {
        let name = normalize_required_name(&draft.name, "expense")?;
        let amount = validate_amount(draft.amount)?;

        with_tx!(self, |db_tx| {
            let category = Self::existing_category(&db_tx, draft.category_id).await?;

            let now = Utc::now();
            let expense = Expense {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                category_id: category.id,
                category_name: category.name.clone(),
                name,
                description: normalize_optional_text(draft.description.as_deref()),
                amount,
                date: draft.date,
                created_at: now,
                updated_at: now,
            };
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;

            Ok(expense)
        })
    }

    /// Apply `patch` to an expense of `user_id`. The owner never changes.
    pub async fn update_expense(
        &self,
        user_id: &str,
        expense_id: Uuid,
        patch: ExpensePatch,
    ) -> ResultEngine<Expense> {
        let name = patch
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "expense"))
            .transpose()?;
        let amount = patch.amount.map(validate_amount).transpose()?;

        with_tx!(self, |db_tx| {
            let mut expense = Self::owned_expense(&db_tx, user_id, expense_id).await?;

            if let Some(category_id) = patch.category_id {
                let category = Self::existing_category(&db_tx, category_id).await?;
                expense.category_id = category.id;
                expense.category_name = category.name;
            }
            if let Some(name) = name {
                expense.name = name;
            }
            if let Some(description) = patch.description {
                expense.description = normalize_optional_text(description.as_deref());
            }
            if let Some(amount) = amount {
                expense.amount = amount;
            }
            if let Some(date) = patch.date {
                expense.date = date;
            }
            expense.updated_at = Utc::now();

            let mut active = expenses::ActiveModel::from(&expense);
            active.id = ActiveValue::Unchanged(expense.id);
            active.user_id = ActiveValue::Unchanged(expense.user_id.clone());
            active.created_at = ActiveValue::Unchanged(expense.created_at);
            active.update(&db_tx).await?;

            Ok(expense)
        })
    }

    pub async fn delete_expense(&self, user_id: &str, expense_id: Uuid) -> ResultEngine<()> {
        let result = expenses::Entity::delete_many()
            .filter(expenses::Column::Id.eq(expense_id))
            .filter(expenses::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("expense not exists".to_string()));
        }
        Ok(())
    }

    async fn owned_expense<C: ConnectionTrait>(
        db: &C,
        user_id: &str,
        expense_id: Uuid,
    ) -> ResultEngine<Expense> {
        let not_found = || EngineError::KeyNotFound("expense not exists".to_string());
        let (model, category) = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::UserId.eq(user_id))
            .find_also_related(categories::Entity)
            .one(db)
            .await?
            .ok_or_else(not_found)?;
        let category =
            category.ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
        Ok(Expense::from_models(model, &category))
    }

    /// Category referenced by an expense write; a dangling id is bad input.
    async fn existing_category<C: ConnectionTrait>(
        db: &C,
        category_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        categories::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::InvalidParameter(format!("category {category_id} does not exist"))
            })
    }
}
