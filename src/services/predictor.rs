use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::errors::AppError;
use crate::models::{
    HistoricalSeries, ModelArchetype, PredictionPoint, TechnicalSnapshot, Trend,
};
use crate::services::random_source::RandomSource;
use crate::services::technical_snapshot;

const FALLBACK_VOLATILITY: f64 = 0.02;
const MEAN_REVERSION_RATE: f64 = 0.001;
/// Largest daily pull back toward the seed price. The unbounded force
/// overshoots and oscillates without limit once the seed price passes 2000.
const MAX_MEAN_REVERSION: f64 = 0.05;
const CONFIDENCE_FLOOR: f64 = 68.0;
const CONFIDENCE_DECAY_PER_DAY: f64 = 1.5;
const MAX_VOLATILITY_PENALTY: f64 = 15.0;
const BAND_WIDTH: f64 = 0.08;
const TREND_THRESHOLD: f64 = 0.002;
const RSI_FLOOR: f64 = 25.0;
const RSI_CEILING: f64 = 75.0;

/// Inputs an archetype sees when choosing the day's price change.
#[derive(Debug, Clone, Copy)]
struct DriftInputs {
    trend_strength: f64,
    direction: f64,
    rsi: f64,
    time_decay: f64,
    random_component: f64,
}

impl ModelArchetype {
    /// Archetype-specific share of the daily change, before mean reversion.
    fn drift(self, inputs: &DriftInputs, rng: &mut dyn RandomSource) -> f64 {
        let params = self.params();
        match self {
            ModelArchetype::Momentum => {
                let momentum = inputs.trend_strength * 0.01;
                momentum * inputs.time_decay
                    + inputs.random_component * params.volatility_multiplier
            }
            ModelArchetype::ContextualTrend => {
                let contextual = inputs.direction
                    * params.trend_strength
                    * (1.2 - rng.uniform(0.0, 0.4));
                contextual * inputs.time_decay
                    + inputs.random_component * params.volatility_multiplier * 0.8
            }
            ModelArchetype::IndicatorReversion => {
                let rsi_influence = (50.0 - inputs.rsi) * 0.0002;
                rsi_influence + inputs.random_component * params.volatility_multiplier * 1.2
            }
        }
    }
}

/// Synthetic price and RSI carried from one simulated day to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DayState {
    price: f64,
    rsi: f64,
}

/// One model instance: a seed price plus everything derived from its
/// history. Built fresh per request and never mutated.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    current_price: f64,
    history: HistoricalSeries,
    snapshot: TechnicalSnapshot,
    trend_strength: f64,
    direction: f64,
}

impl ForecastModel {
    pub fn new(current_price: f64, history: HistoricalSeries) -> Result<Self, AppError> {
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(AppError::Validation(format!(
                "Current price must be positive, got {}",
                current_price
            )));
        }

        let snapshot = technical_snapshot::derive_snapshot(&history);
        let trend_strength = technical_snapshot::trend_strength(&history);
        let direction = technical_snapshot::long_term_direction(&history);

        debug!(
            "Model seeded at {:.2}: {} history points, rsi {:.1}, volatility {:.4}, trend {:.2}",
            current_price,
            history.len(),
            snapshot.rsi,
            snapshot.volatility,
            trend_strength
        );

        Ok(Self {
            current_price,
            history,
            snapshot,
            trend_strength,
            direction,
        })
    }

    /// Build a model from an optional history, synthesizing one when absent.
    pub fn seeded(
        current_price: f64,
        supplied: Option<HistoricalSeries>,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, AppError> {
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(AppError::Validation(format!(
                "Current price must be positive, got {}",
                current_price
            )));
        }
        let history = technical_snapshot::resolve_history(current_price, supplied, rng);
        Self::new(current_price, history)
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn history(&self) -> &HistoricalSeries {
        &self.history
    }

    pub fn snapshot(&self) -> &TechnicalSnapshot {
        &self.snapshot
    }

    pub fn trend_strength(&self) -> f64 {
        self.trend_strength
    }

    /// Annualized volatility used by the formulas; a flat history counts as 2%.
    pub fn volatility(&self) -> f64 {
        if self.snapshot.volatility > 0.0 {
            self.snapshot.volatility
        } else {
            FALLBACK_VOLATILITY
        }
    }

    /// Simulate `days` trading days for one archetype, dated from the day
    /// after `start_date`.
    pub fn predict(
        &self,
        archetype: ModelArchetype,
        days: u32,
        start_date: NaiveDate,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<PredictionPoint>, AppError> {
        if days == 0 {
            return Err(AppError::Validation("Forecast horizon must be at least one day".to_string()));
        }

        let initial = DayState {
            price: self.current_price,
            rsi: self.snapshot.rsi,
        };

        let points = (1..=days)
            .scan(initial, |state, day| {
                let (next, point) = self.step(archetype, *state, day, start_date, &mut *rng);
                *state = next;
                Some(point)
            })
            .collect();

        Ok(points)
    }

    fn step(
        &self,
        archetype: ModelArchetype,
        state: DayState,
        day: u32,
        start_date: NaiveDate,
        rng: &mut dyn RandomSource,
    ) -> (DayState, PredictionPoint) {
        let i = f64::from(day);
        let volatility = self.volatility();

        let time_decay = (-i / 30.0).exp();
        let volatility_factor = volatility * (i / 252.0).sqrt();
        let random_component = rng.centered() * volatility_factor;
        let mean_reversion = ((self.current_price - state.price) * MEAN_REVERSION_RATE)
            .clamp(-MAX_MEAN_REVERSION, MAX_MEAN_REVERSION);

        let inputs = DriftInputs {
            trend_strength: self.trend_strength,
            direction: self.direction,
            rsi: state.rsi,
            time_decay,
            random_component,
        };
        let change = archetype.drift(&inputs, rng) + mean_reversion;

        let price = (state.price * (1.0 + change)).max(0.0);
        let rsi_step = rng.uniform(0.0, 2.0);
        let rsi = if change > 0.0 {
            state.rsi + rsi_step
        } else {
            state.rsi - rsi_step
        }
        .clamp(RSI_FLOOR, RSI_CEILING);

        let confidence = confidence_for_day(archetype.params().base_confidence, i, volatility);
        let half_width = (100.0 - confidence) / 100.0 * price * BAND_WIDTH;

        let trend = if change > TREND_THRESHOLD {
            Trend::Up
        } else if change < -TREND_THRESHOLD {
            Trend::Down
        } else {
            Trend::Neutral
        };

        let volatility_score = f64::max(65.0, 100.0 - volatility * 400.0);
        let momentum_score = 50.0 + self.trend_strength * 100.0 + rng.uniform(0.0, 20.0);

        let point = PredictionPoint {
            date: start_date + Duration::days(i64::from(day)),
            predicted_price: round2(price),
            upper_bound: round2(price + half_width),
            lower_bound: round2((price - half_width).max(0.0)),
            confidence: confidence.round() as u32,
            trend,
            volatility_score: volatility_score.round() as u32,
            momentum_score: momentum_score.round() as i32,
            rsi: rsi.round() as u32,
            support: round2(self.snapshot.support),
            resistance: round2(self.snapshot.resistance),
        };

        (DayState { price, rsi }, point)
    }
}

/// Confidence decays 1.5 points per day from the archetype's base, minus a
/// volatility penalty, never below 68.
pub fn confidence_for_day(base_confidence: f64, day: f64, volatility: f64) -> f64 {
    let time_confidence = f64::max(CONFIDENCE_FLOOR, base_confidence - day * CONFIDENCE_DECAY_PER_DAY);
    let volatility_penalty = f64::min(MAX_VOLATILITY_PENALTY, volatility * 80.0);
    f64::max(CONFIDENCE_FLOOR, time_confidence - volatility_penalty)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
