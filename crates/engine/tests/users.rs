use chrono::Duration;
use sea_orm::{Database, DatabaseConnection};

use engine::{Engine, EngineError, RegisterUserCmd};
use migration::MigratorTrait;

async fn connect() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = connect().await;
    let engine = Engine::builder()
        .database(db.clone())
        .password_cost(4)
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn register_cmd(username: &str, password: &str, confirm: &str) -> RegisterUserCmd {
    RegisterUserCmd {
        username: username.to_string(),
        email: format!("{}@example.com", username.trim()),
        first_name: Some("Ada".to_string()),
        last_name: Some("  ".to_string()),
        password: password.to_string(),
        password_confirm: confirm.to_string(),
    }
}

#[tokio::test]
async fn register_and_fetch_profile() {
    let (engine, _db) = engine_with_db().await;

    let user = engine
        .register_user(register_cmd(" alice ", "correct horse", "correct horse"))
        .await
        .unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.first_name.as_deref(), Some("Ada"));
    assert_eq!(user.last_name, None);

    assert_eq!(engine.user("alice").await.unwrap(), user);

    let err = engine
        .register_user(register_cmd("alice", "another one", "another one"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));
}

#[tokio::test]
async fn register_validates_password() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .register_user(register_cmd("alice", "correct horse", "correct hose"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPassword(_)));

    let err = engine
        .register_user(register_cmd("alice", "short", "short"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPassword(_)));

    let err = engine.user("alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn login_issues_tokens_that_resolve_the_user() {
    let (engine, _db) = engine_with_db().await;
    engine
        .register_user(register_cmd("alice", "correct horse", "correct horse"))
        .await
        .unwrap();

    let (user, tokens) = engine.login("alice", "correct horse").await.unwrap();
    assert_eq!(user.username, "alice");
    assert_ne!(tokens.access.token, tokens.refresh.token);
    assert!(tokens.refresh.expires_at > tokens.access.expires_at);

    let resolved = engine
        .user_for_access_token(&tokens.access.token)
        .await
        .unwrap();
    assert_eq!(resolved, user);

    // A refresh token is not an access token.
    let err = engine
        .user_for_access_token(&tokens.refresh.token)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidCredentials);

    let access = engine
        .refresh_access_token(&tokens.refresh.token)
        .await
        .unwrap();
    assert_ne!(access.token, tokens.access.token);
    assert_eq!(
        engine.user_for_access_token(&access.token).await.unwrap(),
        user
    );

    let err = engine
        .refresh_access_token(&tokens.access.token)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidCredentials);
}

#[tokio::test]
async fn wrong_credentials_look_the_same() {
    let (engine, _db) = engine_with_db().await;
    engine
        .register_user(register_cmd("alice", "correct horse", "correct horse"))
        .await
        .unwrap();

    let wrong_password = engine.login("alice", "battery staple").await.unwrap_err();
    let unknown_user = engine.login("mallory", "correct horse").await.unwrap_err();
    assert_eq!(wrong_password, EngineError::InvalidCredentials);
    assert_eq!(unknown_user, EngineError::InvalidCredentials);

    let err = engine.user_for_access_token("garbage").await.unwrap_err();
    assert_eq!(err, EngineError::InvalidCredentials);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let db = connect().await;
    let engine = Engine::builder()
        .database(db.clone())
        .password_cost(4)
        .access_token_ttl(Duration::zero())
        .refresh_token_ttl(Duration::seconds(-1))
        .build()
        .await
        .unwrap();
    engine
        .register_user(register_cmd("alice", "correct horse", "correct horse"))
        .await
        .unwrap();

    let (_, tokens) = engine.login("alice", "correct horse").await.unwrap();
    let err = engine
        .user_for_access_token(&tokens.access.token)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidCredentials);

    let err = engine
        .refresh_access_token(&tokens.refresh.token)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidCredentials);
}
