use serde::{Deserialize, Serialize};

/// Closing prices, oldest first. Non-finite and non-positive closes are
/// dropped on construction; the series is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoricalSeries {
    closes: Vec<f64>,
}

impl HistoricalSeries {
    pub fn from_closes(closes: impl IntoIterator<Item = f64>) -> Self {
        Self {
            closes: closes
                .into_iter()
                .filter(|c| c.is_finite() && *c > 0.0)
                .collect(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.closes.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.closes.last().copied()
    }
}

/// Technical levels derived from a [`HistoricalSeries`] to seed a model.
///
/// `sma20` is the mean of the whole supplied window, not a rolling 20-day
/// average.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSnapshot {
    pub rsi: f64,
    pub sma20: f64,
    pub volatility: f64, // annualized
    pub support: f64,
    pub resistance: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalKind {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Hold")]
    Hold,
    #[serde(rename = "Sell")]
    Sell,
    #[serde(rename = "Strong Sell")]
    StrongSell,
    #[serde(rename = "No Data")]
    NoData,
}

impl SignalKind {
    pub fn is_bullish(self) -> bool {
        matches!(self, SignalKind::StrongBuy | SignalKind::Buy)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, SignalKind::StrongSell | SignalKind::Sell)
    }

    pub fn color(self) -> &'static str {
        match self {
            SignalKind::StrongBuy => "bg-emerald-500",
            SignalKind::Buy => "bg-blue-500",
            SignalKind::Hold => "bg-yellow-500",
            SignalKind::Sell => "bg-orange-500",
            SignalKind::StrongSell => "bg-red-500",
            SignalKind::NoData => "bg-gray-500",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalStrength {
    Strong,
    Medium,
    Neutral,
    #[serde(rename = "N/A")]
    NotAvailable,
}

/// Reading of a single technical indicator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSignal {
    pub indicator: String,
    pub value: Option<f64>,
    pub signal: SignalKind,
    pub strength: SignalStrength,
    pub action: String,
    pub color: String,
}

/// Vote across all indicator signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalDecision {
    pub signal: SignalKind,
    pub confidence: u32,
    pub action: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalReport {
    pub symbol: String,
    pub current_price: f64,
    pub rsi: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub macd: Option<MacdReading>,
    pub signals: Vec<IndicatorSignal>,
    pub overall: TechnicalDecision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_drops_unusable_closes() {
        let series = HistoricalSeries::from_closes(vec![100.0, f64::NAN, 0.0, -4.0, 101.5]);
        assert_eq!(series.as_slice(), &[100.0, 101.5]);
        assert_eq!(series.first(), Some(100.0));
        assert_eq!(series.last(), Some(101.5));
    }

    #[test]
    fn test_signal_kind_classification() {
        assert!(SignalKind::StrongBuy.is_bullish());
        assert!(SignalKind::Sell.is_bearish());
        assert!(!SignalKind::Hold.is_bullish() && !SignalKind::Hold.is_bearish());
        assert_eq!(serde_json::to_string(&SignalKind::StrongSell).unwrap(), "\"Strong Sell\"");
    }
}
