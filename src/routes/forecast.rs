use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{ForecastReport, Horizon, ModelSelection};
use crate::services::forecasting_service::{self, ForecastRequest};
use crate::services::random_source::RngSource;
use crate::state::AppState;

const SIMULATION_SYMBOL: &str = "SIMULATION";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/simulate", post(simulate_forecast))
        .route("/:symbol", get(get_forecast))
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub horizon: Option<String>,
    pub model: Option<String>,
}

impl ForecastQuery {
    fn parse(&self) -> Result<(Horizon, ModelSelection), AppError> {
        let horizon = self
            .horizon
            .as_deref()
            .map(str::parse::<Horizon>)
            .transpose()?
            .unwrap_or_default();
        let selection = self
            .model
            .as_deref()
            .map(str::parse::<ModelSelection>)
            .transpose()?
            .unwrap_or_default();
        Ok((horizon, selection))
    }
}

pub async fn get_forecast(
    Path(symbol): Path<String>,
    Query(query): Query<ForecastQuery>,
    State(state): State<AppState>,
) -> Result<Json<ForecastReport>, AppError> {
    let (horizon, selection) = query.parse()?;
    info!("GET /api/forecast/{} - {} over {}", symbol, selection, horizon.label());

    let report = forecasting_service::forecast_for_symbol(
        state.price_provider.as_ref(),
        &state.failure_cache,
        &symbol,
        horizon,
        selection,
        state.config.fallback_price,
    )
    .await?;

    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    pub current_price: Option<f64>,
    pub historical_prices: Option<Vec<f64>>,
    pub horizon: Option<Horizon>,
    pub model: Option<ModelSelection>,
    pub seed: Option<u64>,
}

/// Run the engine on caller-supplied inputs without touching the price
/// provider. A seed makes the run reproducible.
pub async fn simulate_forecast(
    State(state): State<AppState>,
    Json(body): Json<SimulateRequest>,
) -> Result<Json<ForecastReport>, AppError> {
    let (current_price, used_fallback_price) =
        forecasting_service::resolve_price(body.current_price, state.config.fallback_price);
    let horizon = body.horizon.unwrap_or_default();
    let selection = body.model.unwrap_or_default();

    info!(
        "POST /api/forecast/simulate - {} at {:.2} over {} (seed: {:?})",
        selection,
        current_price,
        horizon.label(),
        body.seed
    );

    let request = ForecastRequest {
        current_price,
        historical_prices: body.historical_prices,
        horizon,
        selection,
    };

    let mut rng = body
        .seed
        .map(RngSource::seeded)
        .unwrap_or_else(RngSource::from_os);

    let mut report = forecasting_service::generate_forecast(
        SIMULATION_SYMBOL,
        request,
        Utc::now().date_naive(),
        &mut rng,
    )
    .map_err(|e| {
        error!("Simulated forecast failed: {}", e);
        e
    })?;
    report.used_fallback_price = used_fallback_price;

    Ok(Json(report))
}
