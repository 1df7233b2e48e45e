use chrono::NaiveDate;
use tracing::debug;

use crate::errors::AppError;
use crate::models::{ArchetypeRun, ModelArchetype, PredictionPoint, Trend};
use crate::services::predictor::ForecastModel;
use crate::services::random_source::RandomSource;

const ENSEMBLE_CONFIDENCE_BONUS: f64 = 5.0;
const ENSEMBLE_CONFIDENCE_CAP: f64 = 99.0;

/// Day-aligned average of every archetype's path plus the member paths.
#[derive(Debug, Clone)]
pub struct EnsembleRun {
    pub points: Vec<PredictionPoint>,
    pub members: Vec<ArchetypeRun>,
}

/// Run every archetype over the same seed and horizon, then combine.
pub fn run_ensemble(
    model: &ForecastModel,
    days: u32,
    start_date: NaiveDate,
    rng: &mut dyn RandomSource,
) -> Result<EnsembleRun, AppError> {
    let members = ModelArchetype::ALL
        .iter()
        .map(|&archetype| {
            model
                .predict(archetype, days, start_date, &mut *rng)
                .map(|points| ArchetypeRun { model: archetype, points })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let points = combine(model.current_price(), &members)?;
    debug!("Combined {} archetype runs over {} days", members.len(), days);

    Ok(EnsembleRun { points, members })
}

/// Average member runs day by day.
///
/// Confidence gets a flat bonus over the plain mean, and the trend is only
/// ever up or down relative to the previous ensemble price (the seed price
/// on the first day). Momentum, support, resistance and date come from the
/// first member.
pub fn combine(current_price: f64, members: &[ArchetypeRun]) -> Result<Vec<PredictionPoint>, AppError> {
    let first = members
        .first()
        .ok_or_else(|| AppError::Forecast("Ensemble needs at least one member run".to_string()))?;
    let days = first.points.len();

    if let Some(bad) = members.iter().find(|m| m.points.len() != days) {
        return Err(AppError::Forecast(format!(
            "Member run '{}' has {} days, expected {}",
            bad.model,
            bad.points.len(),
            days
        )));
    }

    let count = members.len() as f64;
    let mean = |day: usize, field: fn(&PredictionPoint) -> f64| -> f64 {
        members.iter().map(|m| field(&m.points[day])).sum::<f64>() / count
    };

    let points = (0..days)
        .scan(current_price, |previous_price, day| {
            let predicted_price = mean(day, |p| p.predicted_price);
            let confidence = f64::min(
                ENSEMBLE_CONFIDENCE_CAP,
                mean(day, |p| f64::from(p.confidence)) + ENSEMBLE_CONFIDENCE_BONUS,
            );
            let trend = if predicted_price > *previous_price {
                Trend::Up
            } else {
                Trend::Down
            };
            *previous_price = predicted_price;

            let lead = &first.points[day];
            Some(PredictionPoint {
                date: lead.date,
                predicted_price,
                upper_bound: mean(day, |p| p.upper_bound),
                lower_bound: mean(day, |p| p.lower_bound),
                confidence: confidence.round() as u32,
                trend,
                volatility_score: mean(day, |p| f64::from(p.volatility_score)).round() as u32,
                momentum_score: lead.momentum_score,
                rsi: mean(day, |p| f64::from(p.rsi)).round() as u32,
                support: lead.support,
                resistance: lead.resistance,
            })
        })
        .collect();

    Ok(points)
}
