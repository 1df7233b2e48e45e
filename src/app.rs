use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{forecast, fundamental, health, news, technical};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/forecast", forecast::router())
        .nest("/api/technical", technical::router())
        .nest("/api/fundamental", fundamental::router())
        .nest("/api/news", news::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
