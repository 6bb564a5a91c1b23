// server.rs - Store construction and the HTTP listener shared by both binaries

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::config;
use crate::database::{DatabaseManager, PgStore};
use crate::routes::app;
use crate::state::AppState;

/// Connect to Postgres and apply migrations when configured to
pub async fn connect_store() -> anyhow::Result<PgStore> {
    let database = &config().database;
    let pool = DatabaseManager::connect(database)
        .await
        .context("failed to connect to the database")?;

    if database.run_migrations {
        DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
    }
    Ok(PgStore::new(pool))
}

/// Bind the configured port and serve until the process is stopped
pub async fn serve() -> anyhow::Result<()> {
    let config = config();
    info!("Starting FreeFlow API in {:?} mode", config.environment);
    if crate::is_development!() {
        warn!("Development preset active: fixed JWT secret and low bcrypt cost");
    }

    let store = connect_store().await?;
    let state = AppState::new(Arc::new(store));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("FreeFlow API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
