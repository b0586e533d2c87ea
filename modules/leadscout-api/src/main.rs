use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadscout_api::{router, AppState};
use leadscout_common::Config;
use leadscout_search::{HttpProviders, SearchProxy, SettingsCache};
use leadscout_store::PgLeadStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadscout=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgLeadStore::new(pool));
    store.migrate().await?;

    let providers = Arc::new(HttpProviders::new(config.serpapi_base_url.clone())?);
    let settings = Arc::new(SettingsCache::new(config.settings_cache_ttl));
    let proxy = SearchProxy::new(store.clone(), providers, settings, config.presence_concurrency)
        .with_demo_data(config.demo_data);

    if config.demo_data {
        info!("Demo data enabled for tenants without a SerpAPI key");
    }

    let state = Arc::new(AppState::new(store, proxy));
    let app = router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("LeadScout API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
