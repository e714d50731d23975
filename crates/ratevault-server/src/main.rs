//! Ratevault server binary.
//!
//! Composes the retrieval pipeline (fixer.io fetch → durable store →
//! in-memory cache → lookup service) and exposes it over HTTP.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratevault_core::{
    CachedProvider, CircuitBreaker, FixerRateSource, RateProvider, RateStore, RatesService,
    ReqwestHttpClient, SqliteRateStore, StoreBackedProvider, StoreConfig,
};

mod config;
mod routes;

use config::ServerConfig;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        return Err(e.into());
    }

    let store = SqliteRateStore::connect(StoreConfig {
        url: config.database_url.clone(),
        ..StoreConfig::default()
    })
    .await?;
    info!(database_url = %config.database_url, "durable store ready");

    let base_currency = config.fixer.base_currency.clone();
    let fetcher = FixerRateSource::new(
        config.fixer.clone(),
        Arc::new(ReqwestHttpClient::new()),
        Arc::new(CircuitBreaker::new(config.breaker)),
    );
    let store_backed = StoreBackedProvider::new(
        base_currency.clone(),
        Arc::new(store) as Arc<dyn RateStore>,
        Arc::new(fetcher) as Arc<dyn RateProvider>,
    );
    let cached = CachedProvider::new(config.cache, Arc::new(store_backed));
    let service = Arc::new(RatesService::new(Arc::new(cached)));

    let app = routes::router(AppState { service });
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(
        listen_addr = %config.listen_addr,
        %base_currency,
        "ratevault server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
