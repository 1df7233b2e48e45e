use axum::extract::{Path, State};
use axum::{Json, Router};
use axum::routing::get;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::TechnicalReport;
use crate::services::technical_signal_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:symbol", get(get_technical))
}

pub async fn get_technical(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TechnicalReport>, AppError> {
    info!("GET /api/technical/{} - Technical signals", symbol);
    let report = technical_signal_service::technical_for_symbol(
        state.price_provider.as_ref(),
        &state.failure_cache,
        &symbol,
    )
    .await
    .map_err(|e| {
        warn!("Technical analysis for {} failed: {}", symbol, e);
        e
    })?;
    Ok(Json(report))
}
