//! Summary statistics and explainability output for a forecast.
//!
//! None of this is backtested: every number is a closed-form function of the
//! model's volatility and trend strength, nudged by the selection's tuning
//! parameters and the injected random source.

use crate::models::{
    FeatureImportance, MarketFactors, ModelArchetype, ModelParams, ModelSelection,
    PerformanceMetrics,
};
use crate::services::predictor::{round2, ForecastModel};
use crate::services::random_source::RandomSource;

const FEATURE_BASELINE: [(&str, f64); 7] = [
    ("Momentum (20D)", 85.0),
    ("Market Sentiment", 78.0),
    ("RSI (14D)", 72.0),
    ("Volatility Index", 65.0),
    ("Macro Economic Factors", 58.0),
    ("Trading Volume", 45.0),
    ("Fundamental Strength", 52.0),
];

const FEATURE_JITTER: f64 = 7.5;

pub fn performance_metrics(
    model: &ForecastModel,
    params: &ModelParams,
    rng: &mut dyn RandomSource,
) -> PerformanceMetrics {
    compute_metrics(model.volatility(), model.trend_strength(), params, rng)
}

/// Metrics for a given volatility and trend strength. Only the magnitude of
/// the trend matters.
pub fn compute_metrics(
    volatility: f64,
    trend_strength: f64,
    params: &ModelParams,
    rng: &mut dyn RandomSource,
) -> PerformanceMetrics {
    let trend = trend_strength.abs();

    PerformanceMetrics {
        mape: round2(2.1 + volatility * 12.0),
        rmse: round2(volatility * 800.0),
        directional_accuracy: f64::min(
            95.0,
            round2(82.0 + trend * 10.0 - volatility * 8.0 + params.accuracy_bonus),
        ),
        sharpe_ratio: round2(1.6 + trend * 0.6 - volatility * 1.5 + params.sharpe_bonus),
        max_drawdown_percent: round2(4.0 + volatility * 12.0),
        win_rate: f64::min(
            92.0,
            round2(76.0 + trend * 12.0 - volatility * 6.0 + params.accuracy_bonus),
        ),
        avg_return: round2(trend * 18.0 + rng.uniform(0.0, 4.0)),
    }
}

/// Factor boosts each archetype applies on top of the jittered baseline,
/// keyed by a fragment of the factor name.
fn feature_boosts(selection: ModelSelection) -> &'static [(&'static str, f64)] {
    match selection {
        ModelSelection::Ensemble => &[],
        ModelSelection::Single(ModelArchetype::Momentum) => &[("Momentum", 10.0), ("RSI", 5.0)],
        ModelSelection::Single(ModelArchetype::ContextualTrend) => {
            &[("Macro", 15.0), ("Fundamental", 10.0)]
        }
        ModelSelection::Single(ModelArchetype::IndicatorReversion) => {
            &[("Volume", 10.0), ("Volatility", 8.0)]
        }
    }
}

/// Ranked factor importances, descending, each within `[30, 100]`.
pub fn feature_importance(
    selection: ModelSelection,
    rng: &mut dyn RandomSource,
) -> Vec<FeatureImportance> {
    let boosts = feature_boosts(selection);

    let mut ranked: Vec<FeatureImportance> = FEATURE_BASELINE
        .iter()
        .map(|&(name, base)| {
            let jittered = f64::min(100.0, base + rng.uniform(-FEATURE_JITTER, FEATURE_JITTER));
            let boost: f64 = boosts
                .iter()
                .filter(|(fragment, _)| name.contains(fragment))
                .map(|(_, amount)| amount)
                .sum();

            FeatureImportance {
                name: name.to_string(),
                importance: (jittered + boost).clamp(30.0, 100.0).round() as u32,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.importance.cmp(&a.importance));
    ranked
}

pub fn market_factors(model: &ForecastModel, rng: &mut dyn RandomSource) -> MarketFactors {
    let trend = model.trend_strength().abs();
    let rsi = model.snapshot().rsi;

    MarketFactors {
        technical_score: round2(65.0 + trend * 25.0 + (50.0 - (rsi - 50.0).abs()) * 0.3),
        fundamental_score: round2(72.0 + rng.uniform(0.0, 16.0)),
        sentiment_score: round2(60.0 + trend * 20.0 + rng.uniform(0.0, 12.0)),
        market_regime_score: round2(55.0 + trend * 30.0 + rng.uniform(0.0, 8.0)),
        volume_score: round2(68.0 + rng.uniform(0.0, 20.0)),
        macro_score: round2(62.0 + rng.uniform(0.0, 24.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoricalSeries, ENSEMBLE_PARAMS};
    use crate::services::random_source::{RngSource, ScriptedSource};

    #[test]
    fn test_metrics_formulas() {
        let mut rng = ScriptedSource::constant(0.5);
        let params = ModelArchetype::Momentum.params();
        let metrics = compute_metrics(0.1, -0.5, &params, &mut rng);

        assert_eq!(metrics.mape, 3.3);
        assert_eq!(metrics.rmse, 80.0);
        // 82 + 5 - 0.8 + 2
        assert_eq!(metrics.directional_accuracy, 88.2);
        // 1.6 + 0.3 - 0.15 - 0.1
        assert_eq!(metrics.sharpe_ratio, 1.65);
        assert_eq!(metrics.max_drawdown_percent, 5.2);
        // 76 + 6 - 0.6 + 2
        assert_eq!(metrics.win_rate, 83.4);
        // 9 + 2
        assert_eq!(metrics.avg_return, 11.0);
    }

    #[test]
    fn test_metrics_caps() {
        let mut rng = ScriptedSource::constant(0.5);
        let metrics = compute_metrics(0.0, 1.0, &ENSEMBLE_PARAMS, &mut rng);
        assert_eq!(metrics.directional_accuracy, 95.0);
        assert_eq!(metrics.win_rate, 91.0);

        let boosted = ModelParams { accuracy_bonus: 10.0, ..ENSEMBLE_PARAMS };
        let metrics = compute_metrics(0.0, 1.0, &boosted, &mut rng);
        assert_eq!(metrics.win_rate, 92.0);
    }

    #[test]
    fn test_high_volatility_widens_drawdown() {
        let mut rng = RngSource::seeded(5);
        let params = ModelArchetype::ContextualTrend.params();
        let calm = compute_metrics(0.05, 0.2, &params, &mut rng);
        let wild = compute_metrics(2.0, 0.2, &params, &mut rng);
        assert!(wild.max_drawdown_percent > calm.max_drawdown_percent);
        assert!(wild.directional_accuracy < calm.directional_accuracy);
    }

    #[test]
    fn test_feature_importance_sorted_and_bounded() {
        for seed in 0..50 {
            let mut rng = RngSource::seeded(seed);
            let ranked = feature_importance(ModelSelection::Ensemble, &mut rng);
            assert_eq!(ranked.len(), 7);
            assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
            assert!(ranked.iter().all(|f| (30..=100).contains(&f.importance)));
        }
    }

    #[test]
    fn test_feature_boosts_per_archetype() {
        let lookup = |ranked: &[FeatureImportance], name: &str| {
            ranked.iter().find(|f| f.name == name).map(|f| f.importance).unwrap()
        };

        let mut rng = ScriptedSource::constant(0.5);
        let momentum = feature_importance(ModelSelection::Single(ModelArchetype::Momentum), &mut rng);
        assert_eq!(lookup(&momentum, "Momentum (20D)"), 95);
        assert_eq!(lookup(&momentum, "RSI (14D)"), 77);
        assert_eq!(momentum[0].name, "Momentum (20D)");

        let contextual =
            feature_importance(ModelSelection::Single(ModelArchetype::ContextualTrend), &mut rng);
        assert_eq!(lookup(&contextual, "Macro Economic Factors"), 73);
        assert_eq!(lookup(&contextual, "Fundamental Strength"), 62);

        let reversion =
            feature_importance(ModelSelection::Single(ModelArchetype::IndicatorReversion), &mut rng);
        assert_eq!(lookup(&reversion, "Trading Volume"), 55);
        assert_eq!(lookup(&reversion, "Volatility Index"), 73);
    }

    #[test]
    fn test_market_factors_for_neutral_rsi() {
        let history = HistoricalSeries::from_closes(vec![100.0]);
        let model = ForecastModel::new(100.0, history).unwrap();
        let mut rng = ScriptedSource::constant(0.0);
        let factors = market_factors(&model, &mut rng);

        // rsi 50, no trend: 65 + 15
        assert_eq!(factors.technical_score, 80.0);
        assert_eq!(factors.fundamental_score, 72.0);
        assert_eq!(factors.macro_score, 62.0);
    }
}
