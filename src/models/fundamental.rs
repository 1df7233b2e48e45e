use serde::{Deserialize, Serialize};

/// Valuation and balance-sheet ratios supplied for a rating.
///
/// `roe` is a fraction (0.18 = 18%). `debt_to_equity` is in percent, the
/// way quote services report it. Missing or zero values are unrated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalRatios {
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub roe: Option<f64>,
    pub current_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FundamentalMetric {
    #[serde(rename = "pe")]
    PriceToEarnings,
    #[serde(rename = "pb")]
    PriceToBook,
    #[serde(rename = "roe")]
    ReturnOnEquity,
    #[serde(rename = "currentRatio")]
    CurrentRatio,
    #[serde(rename = "debtToEquity")]
    DebtToEquity,
}

impl FundamentalMetric {
    pub const ALL: [FundamentalMetric; 5] = [
        FundamentalMetric::PriceToEarnings,
        FundamentalMetric::PriceToBook,
        FundamentalMetric::ReturnOnEquity,
        FundamentalMetric::CurrentRatio,
        FundamentalMetric::DebtToEquity,
    ];

    pub fn value_in(self, ratios: &FundamentalRatios) -> Option<f64> {
        match self {
            FundamentalMetric::PriceToEarnings => ratios.pe,
            FundamentalMetric::PriceToBook => ratios.pb,
            FundamentalMetric::ReturnOnEquity => ratios.roe,
            FundamentalMetric::CurrentRatio => ratios.current_ratio,
            FundamentalMetric::DebtToEquity => ratios.debt_to_equity,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RatingGrade {
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Average,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl RatingGrade {
    pub fn color(self) -> &'static str {
        match self {
            RatingGrade::Excellent | RatingGrade::VeryGood => "emerald",
            RatingGrade::Good => "blue",
            RatingGrade::Average => "yellow",
            RatingGrade::Poor => "orange",
            RatingGrade::VeryPoor => "red",
            RatingGrade::NotAvailable => "gray",
        }
    }
}

/// Rating of a single ratio against its lookup table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricRating {
    pub metric: FundamentalMetric,
    pub value: Option<f64>,
    pub score: u32, // 0 when unrated
    pub grade: RatingGrade,
    pub color: String,
    pub investment: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallRating {
    pub score: f64,
    pub label: String,
    pub color: String,
    pub investment: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalReport {
    pub symbol: String,
    pub ratios: FundamentalRatios,
    pub ratings: Vec<MetricRating>,
    pub overall: OverallRating,
}
