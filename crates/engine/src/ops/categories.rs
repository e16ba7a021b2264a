use chrono::Utc;
use sea_orm::{
    ActiveValue, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Category, EngineError, ResultEngine, categories, expenses,
    util::{normalize_category_display, normalize_category_key, normalize_optional_text},
};

use super::{Engine, with_tx};

/// Categories created by [`Engine::seed_default_categories`], as
/// `(name, description)`.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Food & Dining", "Restaurants, groceries, coffee shops"),
    ("Transportation", "Gas, public transit, uber, parking"),
    ("Shopping", "Clothing, electronics, general purchases"),
    ("Entertainment", "Movies, concerts, games, streaming"),
    ("Bills & Utilities", "Rent, electricity, internet, phone"),
    ("Healthcare", "Doctor visits, pharmacy, insurance"),
    ("Education", "Books, courses, training, tuition"),
    ("Travel", "Hotels, flights, vacation expenses"),
    ("Personal Care", "Haircuts, cosmetics, gym membership"),
    ("Other", "Miscellaneous expenses"),
];

/// Partial update of a category.
///
/// `description: Some(None)` clears the description; `None` leaves it as is.
#[derive(Clone, Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl Engine {
    /// All categories, ordered by name.
    pub async fn list_categories(&self) -> ResultEngine<Vec<Category>> {
        Ok(categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::from)
            .collect())
    }

    pub async fn category(&self, category_id: Uuid) -> ResultEngine<Category> {
        categories::Entity::find_by_id(category_id)
            .one(&self.database)
            .await?
            .map(Category::from)
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
    }

    /// Create a category. Names are unique after normalization.
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> ResultEngine<Category> {
        let display = normalize_category_display(name)?;
        let name_norm = normalize_category_key(&display)?;
        let description = normalize_optional_text(description);

        with_tx!(self, |db_tx| {
            Self::ensure_category_name_free(&db_tx, &display, &name_norm, None).await?;

            let now = Utc::now();
            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                name: ActiveValue::Set(display),
                name_norm: ActiveValue::Set(name_norm),
                description: ActiveValue::Set(description),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            Ok(Category::from(model))
        })
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        patch: CategoryPatch,
    ) -> ResultEngine<Category> {
        let renamed = patch
            .name
            .as_deref()
            .map(|name| {
                let display = normalize_category_display(name)?;
                let name_norm = normalize_category_key(&display)?;
                Ok::<_, EngineError>((display, name_norm))
            })
            .transpose()?;

        with_tx!(self, |db_tx| {
            let model = categories::Entity::find_by_id(category_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;

            let mut active: categories::ActiveModel = model.into();
            if let Some((display, name_norm)) = renamed {
                Self::ensure_category_name_free(&db_tx, &display, &name_norm, Some(category_id))
                    .await?;
                active.name = ActiveValue::Set(display);
                active.name_norm = ActiveValue::Set(name_norm);
            }
            if let Some(description) = patch.description {
                active.description =
                    ActiveValue::Set(normalize_optional_text(description.as_deref()));
            }
            active.updated_at = ActiveValue::Set(Utc::now());

            let model = active.update(&db_tx).await?;
            Ok(Category::from(model))
        })
    }

    /// Delete a category.
    ///
    /// Refused with [`EngineError::CategoryInUse`] while any expense, of any
    /// user, still references it.
    pub async fn delete_category(&self, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = categories::Entity::find_by_id(category_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;

            let in_use = expenses::Entity::find()
                .filter(expenses::Column::CategoryId.eq(category_id))
                .count(&db_tx)
                .await?;
            if in_use > 0 {
                return Err(EngineError::CategoryInUse(format!(
                    "'{}' is used by {in_use} expense(s)",
                    model.name
                )));
            }

            categories::Entity::delete_by_id(category_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Create the [`DEFAULT_CATEGORIES`] that are missing.
    ///
    /// Returns every default category with `true` when it was created by this
    /// call. Running it twice is harmless.
    pub async fn seed_default_categories(&self) -> ResultEngine<Vec<(Category, bool)>> {
        with_tx!(self, |db_tx| {
            let mut out = Vec::with_capacity(DEFAULT_CATEGORIES.len());
            for (name, description) in DEFAULT_CATEGORIES {
                let name_norm = normalize_category_key(name)?;
                if let Some(existing) = categories::Entity::find()
                    .filter(categories::Column::NameNorm.eq(name_norm.clone()))
                    .one(&db_tx)
                    .await?
                {
                    out.push((Category::from(existing), false));
                    continue;
                }

                let now = Utc::now();
                let model = categories::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    name: ActiveValue::Set((*name).to_string()),
                    name_norm: ActiveValue::Set(name_norm),
                    description: ActiveValue::Set(Some((*description).to_string())),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                }
                .insert(&db_tx)
                .await?;
                out.push((Category::from(model), true));
            }
            Ok(out)
        })
    }

    async fn ensure_category_name_free<C: ConnectionTrait>(
        db: &C,
        display: &str,
        name_norm: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query =
            categories::Entity::find().filter(categories::Column::NameNorm.eq(name_norm));
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(display.to_string()));
        }
        Ok(())
    }
}
