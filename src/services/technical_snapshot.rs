use crate::models::{HistoricalSeries, TechnicalSnapshot};
use crate::services::random_source::RandomSource;

const SYNTHETIC_HISTORY_LEN: usize = 30;
const SYNTHETIC_BASE_VOLATILITY: f64 = 0.018;
const SYNTHETIC_MEAN_REVERSION: f64 = 0.003;
const RSI_LOOKBACK: usize = 14;
const TREND_LOOKBACK: usize = 5;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const FALLBACK_VOLATILITY: f64 = 0.02;

/// Synthesize a 30-day history ending near `current_price`.
///
/// The walk starts 5% below the current price and each step is pulled back
/// toward it. The pull is proportional to the gap as a fraction of the seed
/// price so the walk stays stable at any price level.
pub fn synthesize_history(current_price: f64, rng: &mut dyn RandomSource) -> HistoricalSeries {
    let start = current_price * 0.95;

    let closes: Vec<f64> = (0..SYNTHETIC_HISTORY_LEN)
        .scan(start, |price, _| {
            let random_walk = rng.centered() * SYNTHETIC_BASE_VOLATILITY;
            let mean_reversion = (current_price - *price) / current_price * SYNTHETIC_MEAN_REVERSION;
            *price *= 1.0 + random_walk + mean_reversion;
            Some(*price)
        })
        .collect();

    HistoricalSeries::from_closes(closes)
}

/// Use the supplied history when there is one, otherwise synthesize.
pub fn resolve_history(
    current_price: f64,
    supplied: Option<HistoricalSeries>,
    rng: &mut dyn RandomSource,
) -> HistoricalSeries {
    match supplied {
        Some(series) if !series.is_empty() => series,
        _ => synthesize_history(current_price, rng),
    }
}

/// Derive RSI, whole-window mean, volatility and support/resistance levels.
pub fn derive_snapshot(series: &HistoricalSeries) -> TechnicalSnapshot {
    let prices = series.as_slice();

    if prices.len() < 2 {
        let price = series.first().unwrap_or(0.0);
        return TechnicalSnapshot {
            rsi: 50.0,
            sma20: price,
            volatility: FALLBACK_VOLATILITY,
            support: price * 0.96,
            resistance: price * 1.04,
        };
    }

    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    TechnicalSnapshot {
        rsi: seed_rsi(prices),
        sma20: prices.iter().sum::<f64>() / prices.len() as f64,
        volatility: annualized_volatility(prices),
        support: min * 0.97,
        resistance: max * 1.03,
    }
}

/// RSI over the first transitions of the series only, not a rolling window.
fn seed_rsi(prices: &[f64]) -> f64 {
    let end = RSI_LOOKBACK.min(prices.len());

    let (gains, losses) = prices[..end]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let rs = gains / f64::max(losses, 0.01);
    100.0 - 100.0 / (1.0 + rs)
}

/// Population standard deviation of log returns, annualized.
fn annualized_volatility(prices: &[f64]) -> f64 {
    let returns: Vec<f64> = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Directional consistency of the last five closes, in `[-1, 1]`.
pub fn trend_strength(series: &HistoricalSeries) -> f64 {
    let prices = series.as_slice();
    if prices.len() < 2 {
        return 0.0;
    }

    let recent = &prices[prices.len().saturating_sub(TREND_LOOKBACK)..];
    let (up, down) = recent.windows(2).fold((0i32, 0i32), |(up, down), w| {
        if w[1] > w[0] {
            (up + 1, down)
        } else if w[1] < w[0] {
            (up, down + 1)
        } else {
            (up, down)
        }
    });

    f64::from(up - down) / (recent.len() - 1) as f64
}

/// `+1.0` when the history closed above where it started, `-1.0` otherwise.
/// Histories too short to compare count as rising.
pub fn long_term_direction(series: &HistoricalSeries) -> f64 {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => {
            if last > first {
                1.0
            } else {
                -1.0
            }
        }
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::random_source::{RngSource, ScriptedSource};

    #[test]
    fn test_synthetic_history_shape() {
        let mut rng = RngSource::seeded(11);
        let series = synthesize_history(1400.0, &mut rng);
        assert_eq!(series.len(), 30);
        assert!(series.as_slice().iter().all(|p| *p > 0.0));
    }

    #[test]
    fn test_synthetic_history_without_noise_reverts_upward() {
        // Centered draws are zero, leaving only the pull toward the seed price.
        let mut rng = ScriptedSource::constant(0.5);
        let series = synthesize_history(1000.0, &mut rng);
        let prices = series.as_slice();
        // 950 * (1 + 0.05 * 0.003)
        assert!((prices[0] - 950.1425).abs() < 1e-9);
        assert!(prices.windows(2).all(|w| w[1] >= w[0]));
        assert!(*prices.last().unwrap() < 1000.0);
    }

    #[test]
    fn test_resolve_history_prefers_supplied_series() {
        let mut rng = ScriptedSource::constant(0.5);
        let supplied = HistoricalSeries::from_closes(vec![10.0, 11.0]);
        let resolved = resolve_history(10.0, Some(supplied.clone()), &mut rng);
        assert_eq!(resolved, supplied);

        let resolved = resolve_history(10.0, Some(HistoricalSeries::default()), &mut rng);
        assert_eq!(resolved.len(), 30);
    }

    #[test]
    fn test_snapshot_levels() {
        let series = HistoricalSeries::from_closes(vec![100.0, 102.0, 101.0, 105.0]);
        let snapshot = derive_snapshot(&series);

        assert!((snapshot.sma20 - 102.0).abs() < 1e-9);
        assert!((snapshot.support - 97.0).abs() < 1e-9);
        assert!((snapshot.resistance - 105.0 * 1.03).abs() < 1e-9);
        // gains 2 + 4, losses 1
        let expected_rsi = 100.0 - 100.0 / (1.0 + 6.0);
        assert!((snapshot.rsi - expected_rsi).abs() < 1e-9);
        assert!(snapshot.volatility > 0.0);
    }

    #[test]
    fn test_snapshot_rsi_only_uses_first_transitions() {
        // 13 rising steps, then a crash that falls outside the RSI window.
        let mut closes: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        closes.extend([50.0, 40.0, 30.0]);
        let snapshot = derive_snapshot(&HistoricalSeries::from_closes(closes));
        let expected = 100.0 - 100.0 / (1.0 + 13.0 / 0.01);
        assert!((snapshot.rsi - expected).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_history_defaults() {
        let snapshot = derive_snapshot(&HistoricalSeries::from_closes(vec![200.0]));
        assert_eq!(snapshot.rsi, 50.0);
        assert_eq!(snapshot.volatility, 0.02);
        assert!((snapshot.support - 192.0).abs() < 1e-9);
        assert!((snapshot.resistance - 208.0).abs() < 1e-9);
        assert_eq!(trend_strength(&HistoricalSeries::from_closes(vec![200.0])), 0.0);
    }

    #[test]
    fn test_snapshot_is_pure() {
        let series = HistoricalSeries::from_closes(vec![1400.0, 1410.0, 1395.0, 1420.0, 1433.0]);
        assert_eq!(derive_snapshot(&series), derive_snapshot(&series));
    }

    #[test]
    fn test_flat_series_has_zero_volatility() {
        let snapshot = derive_snapshot(&HistoricalSeries::from_closes(vec![50.0; 10]));
        assert_eq!(snapshot.volatility, 0.0);
        assert!((snapshot.rsi - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_strength_uses_last_five_points() {
        let up = HistoricalSeries::from_closes(vec![1400.0, 1410.0, 1420.0, 1415.0, 1430.0]);
        assert!((trend_strength(&up) - 0.5).abs() < 1e-9);

        let long = HistoricalSeries::from_closes(vec![1.0, 0.5, 0.2, 10.0, 11.0, 12.0, 13.0, 14.0]);
        assert_eq!(trend_strength(&long), 1.0);

        let down = HistoricalSeries::from_closes(vec![5.0, 4.0, 3.0]);
        assert_eq!(trend_strength(&down), -1.0);
    }

    #[test]
    fn test_long_term_direction() {
        assert_eq!(long_term_direction(&HistoricalSeries::from_closes(vec![1.0, 2.0])), 1.0);
        assert_eq!(long_term_direction(&HistoricalSeries::from_closes(vec![2.0, 1.0])), -1.0);
        assert_eq!(long_term_direction(&HistoricalSeries::from_closes(vec![2.0])), 1.0);
    }
}
