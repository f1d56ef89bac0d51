//! Education Platform Server
//!
//! Loads configuration from the environment, opens the configured store and
//! cache, and serves the `/api/v1` HTTP API.

use dotenv::dotenv;
use std::net::SocketAddr;

use edu_core::{
    api::{create_app, AppState, API_PREFIX},
    cache::create_cache,
    config::AppConfig,
    repository::Stores,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv().ok();

    let config = AppConfig::from_env()?;
    config.validate()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.server.log_level.as_str()),
    )
    .init();

    log::info!("Starting edu-core v{}", edu_core::VERSION);
    log::info!("Storage backend: {:?}", config.storage);

    let stores = Stores::connect(config.storage, &config.database).await?;
    let cache = create_cache(&config.redis).await;

    let state = AppState::new(&config, stores, cache);
    let app = create_app(state, &config.server);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}{}", bind_addr, API_PREFIX);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
