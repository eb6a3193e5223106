use anyhow::{Context, Result};
use fetcher_manager::FetcherManager;
use rainsense::api::{create_query_router, QueryAppState};
use rainsense::config::load_config_or_default;
use rainsense::state::{EntityHost, StateStore};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetcher_manager=info,rainsense=info".into()),
        )
        .init();

    info!("Rainsense starting...");

    let config_path =
        std::env::var("RAINSENSE_CONFIG").unwrap_or_else(|_| "rainsense.toml".to_string());
    let config = load_config_or_default(&config_path)?;

    info!(
        config_path = %config_path,
        latitude = config.home.latitude,
        longitude = config.home.longitude,
        api_enabled = config.api.enabled,
        api_port = config.api.port,
        "Configuration loaded"
    );

    let state_store = Arc::new(StateStore::new());

    // One HTTP client shared by every live integration
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("rainsense/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let mut manager =
        FetcherManager::new(Arc::clone(&state_store) as Arc<dyn EntityHost>, http_client);
    manager.start(&config).await;

    let server_handle = if config.api.enabled {
        let router = create_query_router(Arc::new(QueryAppState {
            state_store: Arc::clone(&state_store),
        }));
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.api.port))
            .await
            .context("Failed to bind query API port")?;
        info!(port = config.api.port, "Query API listening");

        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Query API server error");
            }
        }))
    } else {
        None
    };

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    if let Some(handle) = server_handle {
        handle.abort();
    }
    manager.shutdown().await;
    info!("Rainsense stopped");

    Ok(())
}
