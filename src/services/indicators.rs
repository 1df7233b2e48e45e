//! Rolling indicators over daily closes. Each returns a vector aligned with
//! its input: `None` until the window is filled, then `Some(value)`.

/// Simple Moving Average over `window` values.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    // Running sum; subtract the value that falls out of the window.
    values
        .iter()
        .enumerate()
        .scan(0.0_f64, move |sum, (i, &v)| {
            *sum += v;
            if i >= window {
                *sum -= values[i - window];
            }
            Some((i + 1 >= window).then(|| *sum / window as f64))
        })
        .collect()
}

/// Exponential Moving Average seeded with the first value, hidden until
/// `window` values have been seen.
pub fn ema(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    if window == 0 {
        return vec![None; values.len()];
    }

    let alpha = 2.0 / (window as f64 + 1.0);

    values
        .iter()
        .enumerate()
        .scan(first, move |prev, (i, &v)| {
            *prev = alpha * v + (1.0 - alpha) * *prev;
            Some((i + 1 >= window).then_some(*prev))
        })
        .collect()
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value appears at index `period` and is the plain average of the
/// first `period` gains and losses. A window with no losses reads 100.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return out;
    }

    let changes: Vec<(f64, f64)> = prices
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .collect();

    let p = period as f64;
    let (seed_gain, seed_loss) = changes[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &(gain, loss)| (g + gain, l + loss));

    let to_rsi = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    };

    let initial = (seed_gain / p, seed_loss / p);
    out[period] = Some(to_rsi(initial.0, initial.1));

    changes[period..]
        .iter()
        .scan(initial, |(avg_gain, avg_loss), &(gain, loss)| {
            *avg_gain = (*avg_gain * (p - 1.0) + gain) / p;
            *avg_loss = (*avg_loss * (p - 1.0) + loss) / p;
            Some(to_rsi(*avg_gain, *avg_loss))
        })
        .enumerate()
        .for_each(|(offset, value)| out[period + 1 + offset] = Some(value));

    out
}

/// MACD line, signal line and histogram.
///
/// The signal line is an EMA over the defined part of the MACD line, so it
/// needs `slow + signal - 1` closes before the first value appears.
pub fn macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let fast = ema(prices, fast_period);
    let slow = ema(prices, slow_period);

    let line: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let defined: Vec<f64> = line.iter().flatten().copied().collect();
    let offset = line.len() - defined.len();
    let signal_values = ema(&defined, signal_period);

    let signal: Vec<Option<f64>> = std::iter::repeat(None)
        .take(offset)
        .chain(signal_values)
        .collect();

    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    (line, signal, histogram)
}

/// Most recent defined value of an indicator series.
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_window() {
        let values = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(values, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        assert_eq!(sma(&[1.0, 2.0], 0), vec![None, None]);
        assert_eq!(latest(&sma(&[1.0, 2.0], 3)), None);
    }

    #[test]
    fn test_ema_hides_until_window() {
        let values = ema(&[10.0, 10.0, 10.0, 20.0], 3);
        assert!(values[0].is_none() && values[1].is_none());
        assert_eq!(values[2], Some(10.0));
        // alpha 0.5
        assert_eq!(values[3], Some(15.0));
        assert!(ema(&[], 3).is_empty());
    }

    #[test]
    fn test_rsi_first_value_at_period() {
        let prices = vec![
            44.0, 44.5, 44.0, 45.0, 44.5, 45.5, 45.0, 46.0, 46.5, 46.0, 47.0, 46.5, 47.5, 47.0,
            48.0, 48.5,
        ];
        let values = rsi(&prices, 14);
        assert!(values[..14].iter().all(Option::is_none));
        assert!(values[14..]
            .iter()
            .all(|v| v.map_or(false, |r| (0.0..=100.0).contains(&r))));
    }

    #[test]
    fn test_rsi_extremes() {
        let uptrend: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
        assert_eq!(latest(&rsi(&uptrend, 14)), Some(100.0));

        let downtrend: Vec<f64> = (0..30).map(|i| 80.0 - i as f64).collect();
        assert!(latest(&rsi(&downtrend, 14)).unwrap() < 1e-9);

        assert!(rsi(&[1.0, 2.0], 14).iter().all(Option::is_none));
    }

    #[test]
    fn test_macd_alignment() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.5).collect();
        let (line, signal, histogram) = macd(&prices, 12, 26, 9);

        assert_eq!(line.len(), 50);
        assert_eq!(signal.len(), 50);
        assert_eq!(histogram.len(), 50);

        assert!(line[24].is_none());
        assert!(line[25].is_some());
        assert!(signal[32].is_none());
        assert!(signal[33].is_some());
        assert!(latest(&line).unwrap() > 0.0);
    }

    #[test]
    fn test_macd_short_series_has_no_signal() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let (line, signal, _) = macd(&prices, 12, 26, 9);
        assert!(line.iter().all(Option::is_none));
        assert!(signal.iter().all(Option::is_none));
    }
}
