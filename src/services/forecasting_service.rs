use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::{
    ArchetypeRun, ForecastReport, HistoricalSeries, Horizon, ModelSelection,
};
use crate::services::ensemble;
use crate::services::failure_cache::{FailureCache, FailureKind};
use crate::services::model_metrics;
use crate::services::predictor::ForecastModel;
use crate::services::random_source::{RandomSource, RngSource};
use crate::services::strategy_advisor;

/// Demo price used when no usable quote is available.
pub const DEFAULT_FALLBACK_PRICE: f64 = 1400.0;

/// Roughly three months of daily closes.
const HISTORY_LOOKBACK_DAYS: u32 = 90;

const NSE_SUFFIX: &str = ".NS";

/// Engine input for one forecast run.
#[derive(Debug, Clone, Default)]
pub struct ForecastRequest {
    pub current_price: f64,
    pub historical_prices: Option<Vec<f64>>,
    pub horizon: Horizon,
    pub selection: ModelSelection,
}

/// Upper-case the symbol and append the NSE suffix when it has no exchange
/// suffix. Index symbols (`^NSEI`) are left alone.
pub fn normalize_symbol(symbol: &str) -> Result<String, AppError> {
    let trimmed = symbol.trim().to_uppercase();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Symbol must not be empty".to_string()));
    }

    if trimmed.contains('.') || trimmed.starts_with('^') {
        Ok(trimmed)
    } else {
        Ok(format!("{}{}", trimmed, NSE_SUFFIX))
    }
}

/// Pick the candidate price when it is usable, otherwise the fallback.
/// The flag reports whether the fallback was taken.
pub fn resolve_price(candidate: Option<f64>, fallback: f64) -> (f64, bool) {
    match candidate {
        Some(price) if price.is_finite() && price > 0.0 => (price, false),
        _ => (fallback, true),
    }
}

/// Run the full engine: seed, predict, score and advise.
///
/// The result is all or nothing. Any failure in a run abandons the whole
/// forecast rather than returning a truncated horizon.
pub fn generate_forecast(
    symbol: &str,
    request: ForecastRequest,
    start_date: NaiveDate,
    rng: &mut dyn RandomSource,
) -> Result<ForecastReport, AppError> {
    let ForecastRequest {
        current_price,
        historical_prices,
        horizon,
        selection,
    } = request;

    info!(
        "Generating {} forecast for {} at {:.2} ({})",
        selection,
        symbol,
        current_price,
        horizon.label()
    );

    let supplied = historical_prices.map(HistoricalSeries::from_closes);
    let model = ForecastModel::seeded(current_price, supplied, &mut *rng)?;
    let days = horizon.days();

    let (predictions, model_runs) = match selection {
        ModelSelection::Ensemble => {
            let run = ensemble::run_ensemble(&model, days, start_date, &mut *rng)?;
            (run.points, run.members)
        }
        ModelSelection::Single(archetype) => {
            let points = model.predict(archetype, days, start_date, &mut *rng)?;
            (
                points.clone(),
                vec![ArchetypeRun {
                    model: archetype,
                    points,
                }],
            )
        }
    };

    let params = selection.params();
    let metrics = model_metrics::performance_metrics(&model, &params, &mut *rng);
    let feature_importance = model_metrics::feature_importance(selection, &mut *rng);
    let market_factors = model_metrics::market_factors(&model, &mut *rng);

    let strategy = strategy_advisor::advise_from_run(current_price, &predictions, horizon)
        .ok_or_else(|| AppError::Forecast(format!("Empty prediction run for {}", symbol)))?;
    let rationale = strategy_advisor::model_rationale(selection, current_price, predictions.last());

    Ok(ForecastReport {
        symbol: symbol.to_string(),
        current_price,
        used_fallback_price: false,
        horizon,
        model: selection,
        predictions,
        model_runs,
        snapshot: *model.snapshot(),
        trend_strength: model.trend_strength(),
        metrics,
        feature_importance,
        market_factors,
        strategy,
        rationale,
        generated_at: Utc::now(),
    })
}

/// Daily closes for `ticker`, or `None` when the fallback price should be used.
async fn fetch_recent_closes(
    price_provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    ticker: &str,
) -> Option<Vec<f64>> {
    if let Some(failure) = failure_cache.is_failed(ticker) {
        info!(
            "Skipping quote lookup for {} ({:?}), will retry after {}",
            ticker,
            failure.kind,
            failure.retry_after()
        );
        return None;
    }

    match price_provider.fetch_daily_history(ticker, HISTORY_LOOKBACK_DAYS).await {
        Ok(points) => {
            let closes: Vec<f64> = points.into_iter().map(|p| p.close).collect();
            match closes.last() {
                Some(&last) if last.is_finite() && last > 0.0 => {
                    failure_cache.clear(ticker);
                    Some(closes)
                }
                _ => {
                    warn!("No usable closing price for {}, using fallback price", ticker);
                    failure_cache.record_failure(ticker, FailureKind::Upstream);
                    None
                }
            }
        }
        Err(e) => {
            warn!("Quote lookup for {} failed: {}. Using fallback price", ticker, e);
            failure_cache.record_failure(ticker, FailureKind::from(&e));
            None
        }
    }
}

/// Forecast a listed symbol from live quotes, falling back to the demo price
/// with a synthesized history when quotes are unavailable.
pub async fn forecast_for_symbol(
    price_provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    symbol: &str,
    horizon: Horizon,
    selection: ModelSelection,
    fallback_price: f64,
) -> Result<ForecastReport, AppError> {
    let ticker = normalize_symbol(symbol)?;
    let closes = fetch_recent_closes(price_provider, failure_cache, &ticker).await;

    let (current_price, used_fallback_price) =
        resolve_price(closes.as_ref().and_then(|c| c.last().copied()), fallback_price);
    let historical_prices = if used_fallback_price { None } else { closes };

    let request = ForecastRequest {
        current_price,
        historical_prices,
        horizon,
        selection,
    };

    let mut rng = RngSource::from_os();
    let mut report = generate_forecast(&ticker, request, Utc::now().date_naive(), &mut rng)
        .map_err(|e| {
            error!("Forecast for {} failed: {}", ticker, e);
            e
        })?;
    report.used_fallback_price = used_fallback_price;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::{ExternalPricePoint, PriceProviderError};
    use crate::models::ModelArchetype;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProvider {
        closes: Option<Vec<f64>>,
        calls: AtomicUsize,
    }

    impl StaticProvider {
        fn new(closes: Option<Vec<f64>>) -> Self {
            Self {
                closes,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceProvider for StaticProvider {
        async fn fetch_daily_history(
            &self,
            ticker: &str,
            _days: u32,
        ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let closes = self
                .closes
                .clone()
                .ok_or_else(|| PriceProviderError::NotFound(ticker.to_string()))?;
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            Ok(closes
                .into_iter()
                .enumerate()
                .map(|(i, close)| ExternalPricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    close,
                })
                .collect())
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" reliance ").unwrap(), "RELIANCE.NS");
        assert_eq!(normalize_symbol("TCS.BO").unwrap(), "TCS.BO");
        assert_eq!(normalize_symbol("^NSEI").unwrap(), "^NSEI");
        assert!(normalize_symbol("  ").is_err());
    }

    #[test]
    fn test_resolve_price() {
        assert_eq!(resolve_price(Some(2500.0), 1400.0), (2500.0, false));
        assert_eq!(resolve_price(Some(0.0), 1400.0), (1400.0, true));
        assert_eq!(resolve_price(Some(f64::NAN), 1400.0), (1400.0, true));
        assert_eq!(resolve_price(None, 1400.0), (1400.0, true));
    }

    #[test]
    fn test_ensemble_report_carries_all_member_runs() {
        let request = ForecastRequest {
            current_price: 1400.0,
            historical_prices: Some(vec![1400.0, 1410.0, 1420.0, 1415.0, 1430.0]),
            horizon: Horizon::OneMonth,
            selection: ModelSelection::Ensemble,
        };
        let mut rng = RngSource::seeded(21);
        let report = generate_forecast("RELIANCE.NS", request, start(), &mut rng).unwrap();

        assert_eq!(report.predictions.len(), 30);
        assert_eq!(report.model_runs.len(), 3);
        assert_eq!(report.feature_importance.len(), 7);
        assert!(report.model_runs.iter().all(|run| run.points.len() == 30));
        assert!((report.trend_strength - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_archetype_report() {
        let request = ForecastRequest {
            current_price: 850.0,
            historical_prices: None,
            horizon: Horizon::OneWeek,
            selection: ModelSelection::Single(ModelArchetype::IndicatorReversion),
        };
        let mut rng = RngSource::seeded(4);
        let report = generate_forecast("INFY.NS", request, start(), &mut rng).unwrap();

        assert_eq!(report.predictions.len(), 7);
        assert_eq!(report.model_runs.len(), 1);
        assert_eq!(report.predictions, report.model_runs[0].points);
        assert_eq!(report.rationale.title, "Gradient-Boosted Decision");
    }

    #[test]
    fn test_invalid_price_is_rejected() {
        let request = ForecastRequest {
            current_price: -1.0,
            ..ForecastRequest::default()
        };
        let mut rng = RngSource::seeded(4);
        let err = generate_forecast("INFY.NS", request, start(), &mut rng).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_forecast_uses_last_close() {
        let provider = StaticProvider::new(Some(vec![2400.0, 2450.0, 2475.5]));
        let cache = FailureCache::new();

        let report = forecast_for_symbol(
            &provider,
            &cache,
            "reliance",
            Horizon::OneWeek,
            ModelSelection::Ensemble,
            DEFAULT_FALLBACK_PRICE,
        )
        .await
        .unwrap();

        assert_eq!(report.symbol, "RELIANCE.NS");
        assert_eq!(report.current_price, 2475.5);
        assert!(!report.used_fallback_price);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_and_is_cached() {
        let provider = StaticProvider::new(None);
        let cache = FailureCache::new();

        for _ in 0..2 {
            let report = forecast_for_symbol(
                &provider,
                &cache,
                "NOPE",
                Horizon::OneMonth,
                ModelSelection::Single(ModelArchetype::Momentum),
                DEFAULT_FALLBACK_PRICE,
            )
            .await
            .unwrap();

            assert_eq!(report.current_price, 1400.0);
            assert!(report.used_fallback_price);
            assert_eq!(report.predictions.len(), 30);
        }

        // second request skipped the provider
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.is_failed("NOPE.NS").map(|f| f.kind), Some(FailureKind::NotFound));
    }

    #[tokio::test]
    async fn test_non_positive_quote_falls_back() {
        let provider = StaticProvider::new(Some(vec![10.0, 0.0]));
        let cache = FailureCache::new();

        let report = forecast_for_symbol(
            &provider,
            &cache,
            "ZERO.NS",
            Horizon::OneWeek,
            ModelSelection::Ensemble,
            1200.0,
        )
        .await
        .unwrap();

        assert_eq!(report.current_price, 1200.0);
        assert!(report.used_fallback_price);
        assert_eq!(cache.is_failed("ZERO.NS").map(|f| f.kind), Some(FailureKind::Upstream));
    }
}
