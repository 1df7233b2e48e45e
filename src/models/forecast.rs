use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::strategy::{ModelRationale, StrategyVerdict};
use crate::models::technical::TechnicalSnapshot;

/// Fixed parameterization of a forecasting model. These are tuning
/// constants, not learned weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParams {
    pub volatility_multiplier: f64,
    pub trend_strength: f64,
    pub base_confidence: f64,
    pub accuracy_bonus: f64,
    pub sharpe_bonus: f64,
}

/// Parameters reported for the ensemble's own metrics. The ensemble never
/// simulates a path with these; it averages its members.
pub const ENSEMBLE_PARAMS: ModelParams = ModelParams {
    volatility_multiplier: 1.5,
    trend_strength: 0.004,
    base_confidence: 92.0,
    accuracy_bonus: 3.0,
    sharpe_bonus: 0.3,
};

/// Behavioral archetype of a single predictor.
///
/// Serialized with the names the dashboard exposes (`lstm`, `transformer`,
/// `xgboost`); the behavioral names are accepted as aliases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModelArchetype {
    /// Follows recent price momentum (trend strength of the last few sessions)
    #[serde(rename = "lstm", alias = "momentum")]
    Momentum,

    /// Follows the direction of the whole supplied history
    #[serde(rename = "transformer", alias = "contextual-trend", alias = "contextual_trend")]
    ContextualTrend,

    /// Pulls toward RSI 50
    #[serde(rename = "xgboost", alias = "indicator-reversion", alias = "indicator_reversion")]
    IndicatorReversion,
}

impl ModelArchetype {
    pub const ALL: [ModelArchetype; 3] = [
        ModelArchetype::Momentum,
        ModelArchetype::ContextualTrend,
        ModelArchetype::IndicatorReversion,
    ];

    pub fn params(self) -> ModelParams {
        match self {
            ModelArchetype::Momentum => ModelParams {
                volatility_multiplier: 1.8,
                trend_strength: 0.0045,
                base_confidence: 85.0,
                accuracy_bonus: 2.0,
                sharpe_bonus: -0.1,
            },
            ModelArchetype::ContextualTrend => ModelParams {
                volatility_multiplier: 1.3,
                trend_strength: 0.005,
                base_confidence: 91.0,
                accuracy_bonus: 1.0,
                sharpe_bonus: 0.2,
            },
            ModelArchetype::IndicatorReversion => ModelParams {
                volatility_multiplier: 1.6,
                trend_strength: 0.0035,
                base_confidence: 87.0,
                accuracy_bonus: -1.0,
                sharpe_bonus: 0.1,
            },
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ModelArchetype::Momentum => "lstm",
            ModelArchetype::ContextualTrend => "transformer",
            ModelArchetype::IndicatorReversion => "xgboost",
        }
    }
}

impl fmt::Display for ModelArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Which model(s) a forecast request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelSelection {
    Ensemble,
    Single(ModelArchetype),
}

impl Default for ModelSelection {
    fn default() -> Self {
        ModelSelection::Ensemble
    }
}

impl ModelSelection {
    pub fn params(self) -> ModelParams {
        match self {
            ModelSelection::Ensemble => ENSEMBLE_PARAMS,
            ModelSelection::Single(archetype) => archetype.params(),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ModelSelection::Ensemble => "ensemble",
            ModelSelection::Single(archetype) => archetype.key(),
        }
    }
}

impl fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for ModelSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ensemble" => Ok(ModelSelection::Ensemble),
            "lstm" | "momentum" => Ok(ModelSelection::Single(ModelArchetype::Momentum)),
            "transformer" | "contextual-trend" | "contextual_trend" => {
                Ok(ModelSelection::Single(ModelArchetype::ContextualTrend))
            }
            "xgboost" | "indicator-reversion" | "indicator_reversion" => {
                Ok(ModelSelection::Single(ModelArchetype::IndicatorReversion))
            }
            other => Err(format!(
                "Unknown model '{}'. Must be one of: ensemble, lstm, transformer, xgboost",
                other
            )),
        }
    }
}

impl TryFrom<String> for ModelSelection {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelSelection> for String {
    fn from(value: ModelSelection) -> Self {
        value.key().to_string()
    }
}

/// Forecast horizon offered by the timeframe toggle.
///
/// Query strings and JSON bodies accept the same spellings: `1week`,
/// `1month`, `3months`, or the day count as a string or a number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "HorizonInput", into = "String")]
pub enum Horizon {
    #[default]
    OneWeek,
    OneMonth,
    ThreeMonths,
}

/// Wire form of a horizon before validation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HorizonInput {
    Days(u32),
    Text(String),
}

impl Horizon {
    pub fn days(self) -> u32 {
        match self {
            Horizon::OneWeek => 7,
            Horizon::OneMonth => 30,
            Horizon::ThreeMonths => 90,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Horizon::OneWeek => "1week",
            Horizon::OneMonth => "1month",
            Horizon::ThreeMonths => "3months",
        }
    }

    /// Human-readable label used in rationale text.
    pub fn label(self) -> &'static str {
        match self {
            Horizon::OneWeek => "1 week",
            Horizon::OneMonth => "1 month",
            Horizon::ThreeMonths => "3 months",
        }
    }
}

impl FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1week" | "7" => Ok(Horizon::OneWeek),
            "1month" | "30" => Ok(Horizon::OneMonth),
            "3months" | "90" => Ok(Horizon::ThreeMonths),
            other => Err(format!(
                "Unknown horizon '{}'. Must be one of: 1week, 1month, 3months",
                other
            )),
        }
    }
}

impl TryFrom<HorizonInput> for Horizon {
    type Error = String;

    fn try_from(value: HorizonInput) -> Result<Self, Self::Error> {
        match value {
            HorizonInput::Days(days) => days.to_string().parse(),
            HorizonInput::Text(text) => text.parse(),
        }
    }
}

impl From<Horizon> for String {
    fn from(value: Horizon) -> Self {
        value.key().to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// One simulated trading day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionPoint {
    pub date: NaiveDate,
    pub predicted_price: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
    pub confidence: u32, // percent, 68..=99
    pub trend: Trend,
    pub volatility_score: u32,
    pub momentum_score: i32,
    pub rsi: u32,
    pub support: f64,
    pub resistance: f64,
}

/// Predicted path of one archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeRun {
    pub model: ModelArchetype,
    pub points: Vec<PredictionPoint>,
}

/// Backtest-style summary statistics. Derived from volatility and trend
/// strength, not from comparing predictions to outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub mape: f64,
    pub rmse: f64,
    pub directional_accuracy: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_percent: f64,
    pub win_rate: f64,
    pub avg_return: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportance {
    pub name: String,
    pub importance: u32,
}

/// Composite 0-100 style scores shown next to the forecast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketFactors {
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub sentiment_score: f64,
    pub market_regime_score: f64,
    pub volume_score: f64,
    pub macro_score: f64,
}

/// Everything the dashboard needs to render one forecast request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    pub symbol: String,
    pub current_price: f64,
    /// True when the current price is the demo fallback rather than market data
    pub used_fallback_price: bool,
    pub horizon: Horizon,
    pub model: ModelSelection,
    pub predictions: Vec<PredictionPoint>,
    /// Member paths; all three archetypes for an ensemble, otherwise just the selected one
    pub model_runs: Vec<ArchetypeRun>,
    pub snapshot: TechnicalSnapshot,
    pub trend_strength: f64,
    pub metrics: PerformanceMetrics,
    pub feature_importance: Vec<FeatureImportance>,
    pub market_factors: MarketFactors,
    pub strategy: StrategyVerdict,
    pub rationale: ModelRationale,
    pub generated_at: DateTime<Utc>,
}
