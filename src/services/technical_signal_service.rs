use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::{
    IndicatorSignal, MacdReading, SignalKind, SignalStrength, TechnicalDecision, TechnicalReport,
};
use crate::services::failure_cache::{FailureCache, FailureKind};
use crate::services::forecasting_service::normalize_symbol;
use crate::services::indicators;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const HISTORY_DAYS: u32 = 180;

fn signal(
    indicator: &str,
    value: Option<f64>,
    kind: SignalKind,
    strength: SignalStrength,
    action: impl Into<String>,
) -> IndicatorSignal {
    IndicatorSignal {
        indicator: indicator.to_string(),
        value,
        signal: kind,
        strength,
        action: action.into(),
        color: kind.color().to_string(),
    }
}

pub fn rsi_signal(rsi: f64) -> IndicatorSignal {
    let (kind, strength, action) = if rsi > 70.0 {
        (SignalKind::StrongSell, SignalStrength::Strong, "Consider selling - stock is overbought")
    } else if rsi > 60.0 {
        (SignalKind::Sell, SignalStrength::Medium, "Watch for selling opportunities")
    } else if rsi < 30.0 {
        (SignalKind::StrongBuy, SignalStrength::Strong, "Consider buying - stock is oversold")
    } else if rsi < 40.0 {
        (SignalKind::Buy, SignalStrength::Medium, "Good buying opportunity emerging")
    } else {
        (SignalKind::Hold, SignalStrength::Neutral, "Neutral zone - monitor closely")
    };

    signal("RSI (14)", Some(rsi), kind, strength, action)
}

/// Signal from how far the price sits from a moving average, in percent.
pub fn sma_signal(price: f64, sma: f64, period: usize) -> IndicatorSignal {
    let deviation = if sma > 0.0 { (price - sma) / sma * 100.0 } else { 0.0 };
    let name = format!("SMA ({})", period);

    let (kind, strength, action) = if deviation > 5.0 {
        (
            SignalKind::StrongBuy,
            SignalStrength::Strong,
            format!("Price {:.1}% above {}-day average", deviation, period),
        )
    } else if deviation > 2.0 {
        (
            SignalKind::Buy,
            SignalStrength::Medium,
            format!("Price trending above {}-day average", period),
        )
    } else if deviation < -5.0 {
        (
            SignalKind::StrongSell,
            SignalStrength::Strong,
            format!("Price {:.1}% below {}-day average", deviation.abs(), period),
        )
    } else if deviation < -2.0 {
        (
            SignalKind::Sell,
            SignalStrength::Medium,
            format!("Price trending below {}-day average", period),
        )
    } else {
        (
            SignalKind::Hold,
            SignalStrength::Neutral,
            format!("Price near {}-day average", period),
        )
    };

    signal(&name, Some(sma), kind, strength, action)
}

pub fn macd_signal(macd: Option<&MacdReading>) -> IndicatorSignal {
    let Some(reading) = macd else {
        return signal(
            "MACD",
            None,
            SignalKind::NoData,
            SignalStrength::NotAvailable,
            "Insufficient data for analysis",
        );
    };

    let crossover = reading.line - reading.signal;
    let (kind, strength, action) = if crossover > 0.5 {
        (SignalKind::StrongBuy, SignalStrength::Strong, "MACD line strongly above signal - bullish momentum")
    } else if crossover > 0.0 {
        (SignalKind::Buy, SignalStrength::Medium, "MACD line above signal - positive momentum")
    } else if crossover < -0.5 {
        (SignalKind::StrongSell, SignalStrength::Strong, "MACD line strongly below signal - bearish momentum")
    } else if crossover < 0.0 {
        (SignalKind::Sell, SignalStrength::Medium, "MACD line below signal - negative momentum")
    } else {
        (SignalKind::Hold, SignalStrength::Neutral, "MACD signals are mixed")
    };

    signal("MACD", Some(reading.line), kind, strength, action)
}

/// Majority vote across indicator signals. Strong buys are checked before
/// strong sells.
pub fn overall_decision(signals: &[IndicatorSignal]) -> TechnicalDecision {
    let count = |kind: SignalKind| signals.iter().filter(|s| s.signal == kind).count() as u32;
    let strong_buy = count(SignalKind::StrongBuy);
    let strong_sell = count(SignalKind::StrongSell);
    let bullish = strong_buy + count(SignalKind::Buy);
    let bearish = strong_sell + count(SignalKind::Sell);

    let (kind, confidence, action) = if strong_buy >= 2 || bullish >= 3 {
        (
            SignalKind::StrongBuy,
            u32::min(95, 60 + bullish * 10),
            "Multiple indicators suggest strong buying opportunity",
        )
    } else if bullish > bearish {
        (SignalKind::Buy, 55 + bullish * 5, "Majority of indicators suggest buying")
    } else if strong_sell >= 2 || bearish >= 3 {
        (
            SignalKind::StrongSell,
            u32::min(95, 60 + bearish * 10),
            "Multiple indicators suggest strong selling pressure",
        )
    } else if bearish > bullish {
        (SignalKind::Sell, 55 + bearish * 5, "Majority of indicators suggest selling")
    } else {
        (SignalKind::Hold, 50, "Mixed signals - maintain current position")
    };

    TechnicalDecision {
        signal: kind,
        confidence,
        action: action.to_string(),
        color: kind.color().to_string(),
    }
}

/// Technical read of a close series. Short series fall back to the last
/// close for the averages and 50 for RSI.
pub fn analyze(symbol: &str, closes: &[f64]) -> Result<TechnicalReport, AppError> {
    let current_price = closes
        .last()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| AppError::Validation(format!("No usable closing prices for {}", symbol)))?;

    let rsi = indicators::latest(&indicators::rsi(closes, RSI_PERIOD)).unwrap_or(50.0);
    let sma20 = indicators::latest(&indicators::sma(closes, 20)).unwrap_or(current_price);
    let sma50 = indicators::latest(&indicators::sma(closes, 50)).unwrap_or(current_price);

    let (line, signal_line, histogram) = indicators::macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let macd = match (
        indicators::latest(&line),
        indicators::latest(&signal_line),
        indicators::latest(&histogram),
    ) {
        (Some(line), Some(signal), Some(histogram)) => Some(MacdReading {
            line,
            signal,
            histogram,
        }),
        _ => None,
    };

    let signals = vec![
        rsi_signal(rsi),
        sma_signal(current_price, sma20, 20),
        sma_signal(current_price, sma50, 50),
        macd_signal(macd.as_ref()),
    ];
    let overall = overall_decision(&signals);

    Ok(TechnicalReport {
        symbol: symbol.to_string(),
        current_price,
        rsi,
        sma20,
        sma50,
        macd,
        signals,
        overall,
    })
}

/// Fetch recent closes for a symbol and analyze them.
pub async fn technical_for_symbol(
    price_provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    symbol: &str,
) -> Result<TechnicalReport, AppError> {
    let ticker = normalize_symbol(symbol)?;

    if let Some(failure) = failure_cache.is_failed(&ticker) {
        info!("Skipping technical lookup for {} ({:?})", ticker, failure.kind);
        return Err(match failure.kind {
            FailureKind::NotFound => AppError::NotFound,
            FailureKind::RateLimited => AppError::RateLimited,
            FailureKind::Upstream => AppError::External(format!(
                "Quotes for {} unavailable until {}",
                ticker,
                failure.retry_after()
            )),
        });
    }

    let points = price_provider
        .fetch_daily_history(&ticker, HISTORY_DAYS)
        .await
        .map_err(|e| {
            warn!("Technical lookup for {} failed: {}", ticker, e);
            failure_cache.record_failure(&ticker, FailureKind::from(&e));
            AppError::from(e)
        })?;

    failure_cache.clear(&ticker);
    let closes: Vec<f64> = points.into_iter().map(|p| p.close).collect();
    analyze(&ticker, &closes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_thresholds() {
        assert_eq!(rsi_signal(75.0).signal, SignalKind::StrongSell);
        assert_eq!(rsi_signal(65.0).signal, SignalKind::Sell);
        assert_eq!(rsi_signal(50.0).signal, SignalKind::Hold);
        assert_eq!(rsi_signal(35.0).signal, SignalKind::Buy);
        assert_eq!(rsi_signal(20.0).signal, SignalKind::StrongBuy);
        assert_eq!(rsi_signal(20.0).color, "bg-emerald-500");
    }

    #[test]
    fn test_sma_deviation() {
        let strong = sma_signal(106.0, 100.0, 20);
        assert_eq!(strong.signal, SignalKind::StrongBuy);
        assert_eq!(strong.action, "Price 6.0% above 20-day average");

        assert_eq!(sma_signal(103.0, 100.0, 50).signal, SignalKind::Buy);
        assert_eq!(sma_signal(100.0, 100.0, 50).signal, SignalKind::Hold);
        assert_eq!(sma_signal(97.0, 100.0, 50).signal, SignalKind::Sell);

        let crash = sma_signal(90.0, 100.0, 50);
        assert_eq!(crash.signal, SignalKind::StrongSell);
        assert_eq!(crash.action, "Price 10.0% below 50-day average");
    }

    #[test]
    fn test_macd_crossover() {
        let reading = |line: f64, signal: f64| MacdReading {
            line,
            signal,
            histogram: line - signal,
        };
        assert_eq!(macd_signal(None).signal, SignalKind::NoData);
        assert_eq!(macd_signal(None).strength, SignalStrength::NotAvailable);
        assert_eq!(macd_signal(Some(&reading(2.0, 1.0))).signal, SignalKind::StrongBuy);
        assert_eq!(macd_signal(Some(&reading(1.2, 1.0))).signal, SignalKind::Buy);
        assert_eq!(macd_signal(Some(&reading(1.0, 1.0))).signal, SignalKind::Hold);
        assert_eq!(macd_signal(Some(&reading(0.8, 1.0))).signal, SignalKind::Sell);
        assert_eq!(macd_signal(Some(&reading(0.0, 1.0))).signal, SignalKind::StrongSell);
    }

    #[test]
    fn test_overall_vote() {
        let strong_buys = vec![rsi_signal(20.0), sma_signal(110.0, 100.0, 20), rsi_signal(50.0)];
        let decision = overall_decision(&strong_buys);
        assert_eq!(decision.signal, SignalKind::StrongBuy);
        assert_eq!(decision.confidence, 80);

        let one_buy = vec![rsi_signal(35.0), rsi_signal(50.0), macd_signal(None)];
        let decision = overall_decision(&one_buy);
        assert_eq!(decision.signal, SignalKind::Buy);
        assert_eq!(decision.confidence, 60);

        let bearish = vec![rsi_signal(65.0), rsi_signal(65.0), rsi_signal(65.0)];
        let decision = overall_decision(&bearish);
        assert_eq!(decision.signal, SignalKind::StrongSell);
        assert_eq!(decision.confidence, 90);

        let mixed = vec![rsi_signal(35.0), rsi_signal(65.0)];
        assert_eq!(overall_decision(&mixed).signal, SignalKind::Hold);
        assert_eq!(overall_decision(&mixed).confidence, 50);
    }

    #[test]
    fn test_analyze_short_series_defaults() {
        let report = analyze("TCS.NS", &[3500.0, 3510.0, 3490.0]).unwrap();
        assert_eq!(report.rsi, 50.0);
        assert_eq!(report.sma20, 3490.0);
        assert_eq!(report.sma50, 3490.0);
        assert!(report.macd.is_none());
        assert_eq!(report.signals.len(), 4);
        assert_eq!(report.overall.signal, SignalKind::Hold);
    }

    #[test]
    fn test_analyze_rally() {
        let closes: Vec<f64> = (0..80).map(|i| 1000.0 * 1.01_f64.powi(i)).collect();
        let report = analyze("INFY.NS", &closes).unwrap();

        assert!(report.macd.is_some());
        assert_eq!(report.signals[0].signal, SignalKind::StrongSell);
        assert!(report.signals[1].signal.is_bullish());
        assert!(report.signals[2].signal.is_bullish());
        assert!(report.overall.signal.is_bullish());
    }

    #[test]
    fn test_analyze_rejects_empty_series() {
        assert!(analyze("TCS.NS", &[]).is_err());
    }
}
