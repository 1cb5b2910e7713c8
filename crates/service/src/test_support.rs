#![cfg(test)]
use migration::MigratorTrait;
use models::db::connect_with_config;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

fn database_config() -> Option<configs::DatabaseConfig> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let mut cfg = configs::DatabaseConfig { url: std::env::var("DATABASE_URL").ok()?, ..Default::default() };
    cfg.min_connections = 1;
    cfg.max_connections = cfg.max_connections.max(10);
    Some(cfg)
}

/// Fresh connection for the current test's runtime, or `None` when no database is configured.
pub async fn get_db() -> Result<Option<DatabaseConnection>, anyhow::Error> {
    let Some(cfg) = database_config() else { return Ok(None) };

    // Run migrations exactly once, with a throwaway connection
    MIGRATED
        .get_or_try_init(|| async {
            let db = connect_with_config(&cfg).await?;
            migration::Migrator::up(&db, None).await?;
            drop(db);
            Ok::<_, anyhow::Error>(())
        })
        .await?;

    let db = connect_with_config(&cfg).await?;
    Ok(Some(db))
}
