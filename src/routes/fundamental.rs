use axum::extract::{Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::{FundamentalRatios, FundamentalReport};
use crate::services::fundamental_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:symbol", get(get_fundamental))
}

/// Rate caller-supplied ratios, e.g.
/// `/api/fundamental/TCS?pe=28&pb=12&roe=0.45&currentRatio=2.6&debtToEquity=8`.
pub async fn get_fundamental(
    Path(symbol): Path<String>,
    Query(ratios): Query<FundamentalRatios>,
) -> Result<Json<FundamentalReport>, AppError> {
    info!("GET /api/fundamental/{} - {:?}", symbol, ratios);
    let report = fundamental_service::evaluate(&symbol, ratios)?;
    Ok(Json(report))
}
