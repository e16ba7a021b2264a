use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    CategoryPatch, DEFAULT_CATEGORIES, Engine, EngineError, ExpenseDraft, Money, RegisterUserCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .password_cost(4)
        .build()
        .await
        .unwrap();
    (engine, db)
}

#[tokio::test]
async fn names_are_unique_after_normalization() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .create_category("  Food   &  Dining ", Some("Restaurants"))
        .await
        .unwrap();
    assert_eq!(created.name, "Food & Dining");
    assert_eq!(created.description.as_deref(), Some("Restaurants"));

    for clash in ["food & dining", "FOOD DINING", "Fóod - Dining"] {
        let err = engine.create_category(clash, None).await.unwrap_err();
        assert!(matches!(err, EngineError::ExistingKey(_)), "{clash}");
    }

    let err = engine.create_category("  ", None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));

    let listed = engine.list_categories().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn categories_are_listed_by_name() {
    let (engine, _db) = engine_with_db().await;
    for name in ["Travel", "Bills", "Food"] {
        engine.create_category(name, None).await.unwrap();
    }

    let names: Vec<String> = engine
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Bills", "Food", "Travel"]);
}

#[tokio::test]
async fn rename_keeps_uniqueness() {
    let (engine, _db) = engine_with_db().await;
    let food = engine.create_category("Food", None).await.unwrap();
    engine.create_category("Travel", None).await.unwrap();

    let err = engine
        .update_category(
            food.id,
            CategoryPatch {
                name: Some("travel".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Renaming to a variant of its own name is allowed.
    let renamed = engine
        .update_category(
            food.id,
            CategoryPatch {
                name: Some("FOOD".to_string()),
                description: Some(Some("Everything edible".to_string())),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "FOOD");
    assert_eq!(renamed.description.as_deref(), Some("Everything edible"));

    let cleared = engine
        .update_category(
            food.id,
            CategoryPatch {
                description: Some(None),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.description, None);
    assert_eq!(engine.category(food.id).await.unwrap(), cleared);

    let err = engine
        .update_category(Uuid::new_v4(), CategoryPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn delete_is_blocked_while_in_use() {
    let (engine, _db) = engine_with_db().await;
    engine
        .register_user(RegisterUserCmd {
            username: "alice".to_string(),
            email: String::new(),
            first_name: None,
            last_name: None,
            password: "correct horse".to_string(),
            password_confirm: "correct horse".to_string(),
        })
        .await
        .unwrap();
    let food = engine.create_category("Food", None).await.unwrap();
    let expense = engine
        .create_expense(
            "alice",
            ExpenseDraft {
                name: "Lunch".to_string(),
                description: None,
                amount: Money::new(1200),
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                category_id: food.id,
            },
        )
        .await
        .unwrap();

    let err = engine.delete_category(food.id).await.unwrap_err();
    assert!(matches!(err, EngineError::CategoryInUse(_)));
    assert!(engine.expense("alice", expense.id).await.is_ok());

    engine.delete_expense("alice", expense.id).await.unwrap();
    engine.delete_category(food.id).await.unwrap();

    let err = engine.category(food.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine.delete_category(food.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let (engine, _db) = engine_with_db().await;
    engine.create_category("travel", None).await.unwrap();

    let first = engine.seed_default_categories().await.unwrap();
    assert_eq!(first.len(), DEFAULT_CATEGORIES.len());
    let created = first.iter().filter(|(_, created)| *created).count();
    assert_eq!(created, DEFAULT_CATEGORIES.len() - 1);

    let second = engine.seed_default_categories().await.unwrap();
    assert!(second.iter().all(|(_, created)| !created));
    assert_eq!(
        engine.list_categories().await.unwrap().len(),
        DEFAULT_CATEGORIES.len()
    );
}
