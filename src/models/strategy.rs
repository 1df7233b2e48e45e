use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete recommendation derived from the last day of a forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Verdict {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "CONSIDER SELL")]
    ConsiderSell,
    #[serde(rename = "SELL")]
    Sell,
}

impl Verdict {
    pub fn badge_color(self) -> &'static str {
        match self {
            Verdict::StrongBuy => "bg-green-600 hover:bg-green-700",
            Verdict::Buy => "bg-green-500 hover:bg-green-600",
            Verdict::Hold => "bg-gray-500 hover:bg-gray-600",
            Verdict::ConsiderSell => "bg-yellow-600 hover:bg-yellow-700",
            Verdict::Sell => "bg-red-600 hover:bg-red-700",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::StrongBuy => "STRONG BUY",
            Verdict::Buy => "BUY",
            Verdict::Hold => "HOLD",
            Verdict::ConsiderSell => "CONSIDER SELL",
            Verdict::Sell => "SELL",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrategyVerdict {
    pub verdict: Verdict,
    pub rationale: String,
    pub badge_color: String,
}

/// Narrative explaining what the selected model is reacting to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRationale {
    pub title: String,
    pub description: String,
}
