use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use podcastpal::{
    AppState, Args, Config, FeedService, MemoryCache, MemoryRepository, ReqwestClient, SystemClock,
    serve,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from(Args::parse());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let repository = MemoryRepository::from_json_file(&config.data, config.feed.time_zone)
        .with_context(|| format!("Failed to load feeds from {}", config.data.display()))?;
    tracing::info!(
        feeds = repository.len(),
        time_zone = %config.feed.time_zone,
        "Loaded feed data"
    );
    if repository.is_empty() {
        tracing::warn!(path = %config.data.display(), "Feed data contains no feeds");
    }

    let client = ReqwestClient::with_timeout(config.feed.size_timeout)
        .context("Failed to create HTTP client")?;

    let service = FeedService::new(
        Arc::new(client),
        Arc::new(MemoryCache::with_capacity(config.cache_capacity)),
        Arc::new(SystemClock),
        config.feed.clone(),
    );

    let state = AppState::new(
        Arc::new(service),
        Arc::new(repository),
        config.public_url.clone(),
    );

    serve(config.listen, state).await.context("Server failed")?;

    Ok(())
}
