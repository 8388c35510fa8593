use std::sync::Arc;

use actix_web::{web, HttpServer};
use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};

use kg_core::services::outbox::{DrainEngineConfig, OutboxDrainEngine};
use kg_infra::{create_dispatcher, DatabasePool, MySqlOutboxStore};
use kg_shared::config::AppConfig;
use kg_worker::telemetry::init_tracing;
use kg_worker::{create_app, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    init_tracing(&config.logging)?;

    config.validate().map_err(anyhow::Error::msg).context("invalid configuration")?;
    if config.token.is_using_default_secret() {
        warn!("FLOW_TOKEN_SECRET is not set, using the development secret");
    }

    info!(
        environment = %config.environment,
        bind_address = %config.server.bind_address(),
        "Starting Keygate worker"
    );

    let database = DatabasePool::new(&config.database)
        .await
        .context("failed to connect to database")?;
    let store = Arc::new(MySqlOutboxStore::new(database.get_pool().clone()));
    let dispatcher = Arc::new(
        create_dispatcher(&config.channels, config.environment).context("failed to configure channels")?,
    );

    let engine = Arc::new(OutboxDrainEngine::new(
        store,
        dispatcher,
        DrainEngineConfig::from(&config.outbox),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let drain_handle = Arc::clone(&engine).start_background_task(shutdown_rx);

    let app_state = web::Data::new(AppState::new(engine, Some(database.clone())));
    HttpServer::new(move || create_app(app_state.clone()))
        .bind(config.server.bind_address())
        .with_context(|| format!("failed to bind {}", config.server.bind_address()))?
        .run()
        .await?;

    info!("Health server stopped, shutting down outbox drain");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = drain_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "Outbox drain task ended abnormally");
        }
    }
    database.close().await;

    info!("Keygate worker stopped");
    Ok(())
}
