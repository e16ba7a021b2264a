use chrono::Duration;
use migration::{Migrator, MigratorTrait};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "outlay={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let server = settings.server;
    tracing::info!("Found server settings...");

    let db = connect_database(&server.database).await.inspect_err(|err| {
        tracing::error!("failed to initialize database: {err}");
    })?;

    let engine = engine::Engine::builder()
        .database(db)
        .access_token_ttl(Duration::minutes(server.access_token_ttl_minutes))
        .refresh_token_ttl(Duration::hours(server.refresh_token_ttl_hours))
        .build()
        .await
        .inspect_err(|err| tracing::error!("failed to build engine from database: {err}"))?;

    if server.seed_categories {
        let seeded = engine.seed_default_categories().await?;
        let created = seeded.iter().filter(|(_, created)| *created).count();
        tracing::info!("seeded {created} default categories");
    }

    let mut tasks = tokio::task::JoinSet::new();
    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let port = server.port;
    tasks.spawn(async move {
        if let Err(err) = server::run(engine, &bind, port).await {
            tracing::error!("server failed: {err}");
        }
    });

    tokio::select! {
        _ = tasks.join_next() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
    tasks.shutdown().await;

    Ok(())
}

async fn connect_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
