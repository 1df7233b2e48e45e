use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::services::forecasting_service::DEFAULT_FALLBACK_PRICE;
use crate::services::news_service::NewsConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_CLEANUP_SECS: u64 = 600;

/// Server settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub fallback_price: f64,
    pub yahoo_base_url: Option<String>,
    /// How often expired failure-cache entries are swept
    pub failure_cache_cleanup_interval: Duration,
    pub news: NewsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            fallback_price: DEFAULT_FALLBACK_PRICE,
            yahoo_base_url: None,
            failure_cache_cleanup_interval: Duration::from_secs(DEFAULT_CACHE_CLEANUP_SECS),
            news: NewsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            // a non-positive fallback would leave the engine without a seed price
            fallback_price: std::env::var("DEMO_FALLBACK_PRICE")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(defaults.fallback_price),
            yahoo_base_url: std::env::var("YAHOO_BASE_URL").ok().filter(|s| !s.is_empty()),
            failure_cache_cleanup_interval: std::env::var("FAILURE_CACHE_CLEANUP_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.failure_cache_cleanup_interval),
            news: NewsConfig::from_env(),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
