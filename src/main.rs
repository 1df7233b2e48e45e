use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use niftyscope::app;
use niftyscope::config::ServerConfig;
use niftyscope::external::price_provider::PriceProvider;
use niftyscope::external::yahoo::YahooProvider;
use niftyscope::logging::{init_logging, LoggingConfig};
use niftyscope::services::failure_cache::FailureCache;
use niftyscope::services::news_service::{NewsService, SyntheticNewsFeed};
use niftyscope::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = ServerConfig::from_env();

    let price_provider: Arc<dyn PriceProvider> = match &config.yahoo_base_url {
        Some(url) => {
            info!("📊 Using Yahoo chart API at {}", url);
            Arc::new(YahooProvider::with_base_url(url.clone()))
        }
        None => Arc::new(YahooProvider::new()),
    };

    let news = Arc::new(NewsService::new(Arc::new(SyntheticNewsFeed::new())));
    if config.news.enabled {
        news.start(config.news.symbol.clone(), config.news.poll_interval);
    } else {
        warn!("News polling disabled (NEWS_ENABLED=false)");
    }

    let failure_cache = FailureCache::new();
    let cache_cleanup = failure_cache.spawn_cleanup(config.failure_cache_cleanup_interval);

    let addr = config.socket_addr();
    let state = AppState {
        price_provider,
        failure_cache,
        news: news.clone(),
        config: Arc::new(config),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(addr).await?;
    info!("🚀 Forecast backend running at http://{}/", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    news.stop();
    cache_cleanup.abort();
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
