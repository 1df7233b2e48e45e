use crate::models::{
    Horizon, ModelArchetype, ModelRationale, ModelSelection, PredictionPoint, StrategyVerdict,
    Verdict,
};

/// Percent move from the seed price to a predicted price.
pub fn percent_change(current_price: f64, predicted_price: f64) -> f64 {
    if current_price <= 0.0 {
        return 0.0;
    }
    (predicted_price - current_price) / current_price * 100.0
}

/// Map a forecast outcome to a verdict. Rules are checked in order and the
/// first match wins.
pub fn advise(
    change_percent: f64,
    confidence: f64,
    volatility_score: f64,
    horizon: Horizon,
) -> StrategyVerdict {
    let risk_level = 100.0 - volatility_score;
    let timeframe = horizon.label();

    let (verdict, rationale) = if change_percent > 5.0 && confidence > 85.0 && risk_level < 40.0 {
        (
            Verdict::StrongBuy,
            format!(
                "High-conviction signal for a potential {:.1}% gain over {}. Favorable risk/reward.",
                change_percent, timeframe
            ),
        )
    } else if change_percent > 2.0 && confidence > 75.0 {
        (
            Verdict::Buy,
            format!(
                "Positive outlook with an expected gain of {:.1}% over {}. Monitor volatility.",
                change_percent, timeframe
            ),
        )
    } else if change_percent < -5.0 && confidence > 80.0 {
        (
            Verdict::Sell,
            format!(
                "High probability of a significant correction of {:.1}% over {}. Consider taking profits.",
                change_percent.abs(),
                timeframe
            ),
        )
    } else if change_percent < -2.0 && confidence > 70.0 {
        (
            Verdict::ConsiderSell,
            format!(
                "Model indicates potential downside of {:.1}% over {}. Caution is advised.",
                change_percent.abs(),
                timeframe
            ),
        )
    } else {
        (
            Verdict::Hold,
            format!(
                "Neutral outlook. The model does not signal a strong directional move for the next {}.",
                timeframe
            ),
        )
    };

    StrategyVerdict {
        verdict,
        rationale,
        badge_color: verdict.badge_color().to_string(),
    }
}

/// Verdict for the final day of a run.
pub fn advise_from_run(
    current_price: f64,
    points: &[PredictionPoint],
    horizon: Horizon,
) -> Option<StrategyVerdict> {
    let last = points.last()?;
    Some(advise(
        percent_change(current_price, last.predicted_price),
        f64::from(last.confidence),
        f64::from(last.volatility_score),
        horizon,
    ))
}

/// Narrative for what the selected model reacted to, based on its last day.
pub fn model_rationale(
    selection: ModelSelection,
    current_price: f64,
    last: Option<&PredictionPoint>,
) -> ModelRationale {
    let Some(prediction) = last else {
        return ModelRationale {
            title: "Awaiting Data".to_string(),
            description: "Rationale will be generated once the model runs.".to_string(),
        };
    };

    let change = percent_change(current_price, prediction.predicted_price);
    let direction = if change > 0.0 { "upward" } else { "downward" };
    let strength = if change.abs() > 5.0 { "strong" } else { "moderate" };

    let (title, description) = match selection {
        ModelSelection::Ensemble => (
            "Ensemble Consensus",
            format!(
                "The ensemble model synthesizes insights from LSTM, Transformer, and XGBoost models. \
                 It predicts a {} {} trend, averaging multiple methodologies for a balanced, \
                 high-confidence forecast of {:.1}%. This approach mitigates individual model bias.",
                strength, direction, change
            ),
        ),
        ModelSelection::Single(ModelArchetype::Momentum) => (
            "Momentum & Sequence Analysis",
            format!(
                "The LSTM model, focusing on time-series patterns, detects a clear {} momentum. \
                 Its prediction of a {:.1}% move is heavily influenced by recent price action and \
                 trend persistence.",
                direction, change
            ),
        ),
        ModelSelection::Single(ModelArchetype::ContextualTrend) => (
            "Contextual Market Analysis",
            format!(
                "The Transformer model analyzes broader market context and relationships. It \
                 identifies underlying factors suggesting a {} {} trajectory, resulting in a {:.1}% \
                 forecast. It excels at capturing long-range dependencies.",
                strength, direction, change
            ),
        ),
        ModelSelection::Single(ModelArchetype::IndicatorReversion) => (
            "Gradient-Boosted Decision",
            format!(
                "XGBoost, a decision-tree-based model, has identified key technical thresholds. \
                 Its forecast for a {:.1}% change is based on factors like an RSI of {} and recent \
                 volatility, pointing to a {} bias.",
                change, prediction.rsi, direction
            ),
        ),
    };

    ModelRationale {
        title: title.to_string(),
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_buy_requires_low_risk() {
        let strong = advise(6.0, 90.0, 70.0, Horizon::OneMonth);
        assert_eq!(strong.verdict, Verdict::StrongBuy);
        assert_eq!(strong.badge_color, "bg-green-600 hover:bg-green-700");
        assert!(strong.rationale.contains("6.0%"));
        assert!(strong.rationale.contains("1 month"));

        // risk level 70 fails rule 1, rule 2 still matches
        let buy = advise(6.0, 90.0, 30.0, Horizon::OneMonth);
        assert_eq!(buy.verdict, Verdict::Buy);
    }

    #[test]
    fn test_sell_side_rules() {
        assert_eq!(advise(-6.0, 85.0, 80.0, Horizon::OneWeek).verdict, Verdict::Sell);
        // confidence too low for SELL, enough for CONSIDER SELL
        let consider = advise(-6.0, 75.0, 80.0, Horizon::ThreeMonths);
        assert_eq!(consider.verdict, Verdict::ConsiderSell);
        assert!(consider.rationale.contains("6.0%"));
        assert!(consider.rationale.contains("3 months"));
        assert_eq!(advise(-3.0, 60.0, 80.0, Horizon::OneWeek).verdict, Verdict::Hold);
    }

    #[test]
    fn test_hold_is_default() {
        let hold = advise(1.0, 99.0, 99.0, Horizon::OneWeek);
        assert_eq!(hold.verdict, Verdict::Hold);
        assert_eq!(hold.badge_color, "bg-gray-500 hover:bg-gray-600");
        // thresholds are strict
        assert_eq!(advise(2.0, 90.0, 90.0, Horizon::OneWeek).verdict, Verdict::Hold);
    }

    #[test]
    fn test_advice_is_deterministic() {
        let a = advise(3.5, 80.0, 70.0, Horizon::OneMonth);
        let b = advise(3.5, 80.0, 70.0, Horizon::OneMonth);
        assert_eq!(a, b);
    }

    #[test]
    fn test_percent_change() {
        assert!((percent_change(1400.0, 1484.0) - 6.0).abs() < 1e-9);
        assert_eq!(percent_change(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_rationale_mentions_rsi_for_indicator_model() {
        let point = PredictionPoint {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            predicted_price: 1330.0,
            upper_bound: 1340.0,
            lower_bound: 1320.0,
            confidence: 80,
            trend: crate::models::Trend::Down,
            volatility_score: 90,
            momentum_score: 55,
            rsi: 41,
            support: 1300.0,
            resistance: 1500.0,
        };
        let rationale = model_rationale(
            ModelSelection::Single(ModelArchetype::IndicatorReversion),
            1400.0,
            Some(&point),
        );
        assert_eq!(rationale.title, "Gradient-Boosted Decision");
        assert!(rationale.description.contains("RSI of 41"));
        assert!(rationale.description.contains("downward"));

        let ensemble = model_rationale(ModelSelection::Ensemble, 1400.0, Some(&point));
        assert!(ensemble.description.contains("moderate downward"));

        assert_eq!(model_rationale(ModelSelection::Ensemble, 1400.0, None).title, "Awaiting Data");
    }
}
