use std::sync::Arc;

use crate::config::ServerConfig;
use crate::external::price_provider::PriceProvider;
use crate::services::failure_cache::FailureCache;
use crate::services::news_service::NewsService;

#[derive(Clone)]
pub struct AppState {
    pub price_provider: Arc<dyn PriceProvider>,
    pub failure_cache: FailureCache,
    pub news: Arc<NewsService>,
    pub config: Arc<ServerConfig>,
}
