use std::{env, net::SocketAddr, path::Path, sync::Arc};

use axum::Router;
use common::{env::ensure_data_dir, utils::logging::init_logging};
use configs::{AppConfig, StorageBackend};
use dotenvy::dotenv;
use migration::MigratorTrait;
use models::category::CategoryField;
use service::category::{CategoryRepository, JsonFileCategoryRepository, SeaOrmCategoryRepository};
use service::pagination::PaginationDefaults;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// config.toml when present (path from `CONFIG_PATH`), otherwise defaults plus env vars
pub fn load_config() -> anyhow::Result<AppConfig> {
    let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        AppConfig::load_and_validate()
    } else {
        warn!(%path, "config file not found; using defaults and environment");
        AppConfig::from_env()
    }
}

/// Open the configured storage backend, running migrations for the database.
pub async fn build_repository(cfg: &AppConfig) -> anyhow::Result<Arc<dyn CategoryRepository>> {
    match cfg.storage.backend {
        StorageBackend::Database => {
            let db = models::db::connect_with_config(&cfg.database).await?;
            migration::Migrator::up(&db, None).await?;
            info!("database migrations applied");
            Ok(Arc::new(SeaOrmCategoryRepository::new(db)))
        }
        StorageBackend::File => {
            let path = Path::new(&cfg.storage.data_file);
            ensure_data_dir(path).await?;
            let repo = JsonFileCategoryRepository::open(path).await?;
            info!(path = %path.display(), "file storage ready");
            Ok(Arc::new(repo))
        }
    }
}

/// Build handler state from config; rejects a default sort column the entity does not have.
pub async fn build_state(cfg: &AppConfig) -> Result<ServerState, StartupError> {
    if let Err(e) = cfg.pagination.order_column.parse::<CategoryField>() {
        return Err(StartupError::InvalidConfig(format!("pagination.order_column: {e}")));
    }
    let repo = build_repository(cfg).await?;
    Ok(ServerState::new(repo, PaginationDefaults::from(&cfg.pagination)))
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = load_config()?;
    init_logging(&cfg.logging.format);

    let state = build_state(&cfg).await?;
    let app: Router = routes::build_router(state, build_cors());

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, backend = ?cfg.storage.backend, "starting category server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
