use tracing::info;

use crate::errors::AppError;
use crate::models::{
    FundamentalMetric, FundamentalRatios, FundamentalReport, MetricRating, OverallRating,
    RatingGrade,
};
use crate::services::forecasting_service::normalize_symbol;

/// One rung of a rating ladder.
struct Band {
    limit: f64,
    score: u32,
    grade: RatingGrade,
    investment: &'static str,
    reason: &'static str,
}

const fn band(
    limit: f64,
    score: u32,
    grade: RatingGrade,
    investment: &'static str,
    reason: &'static str,
) -> Band {
    Band { limit, score, grade, investment, reason }
}

enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// Ordered bands plus the rating for anything past the last one.
struct Ladder {
    direction: Direction,
    bands: [Band; 5],
    worst: Band,
}

const PE_LADDER: Ladder = Ladder {
    direction: Direction::LowerIsBetter,
    bands: [
        band(10.0, 95, RatingGrade::Excellent, "Strong Buy", "Significantly undervalued with strong earnings potential"),
        band(15.0, 85, RatingGrade::VeryGood, "Buy", "Undervalued with good earnings growth"),
        band(20.0, 70, RatingGrade::Good, "Buy", "Fairly valued with decent earnings"),
        band(25.0, 55, RatingGrade::Average, "Hold", "Moderately valued, monitor for better entry"),
        band(35.0, 35, RatingGrade::Poor, "Avoid", "Overvalued relative to earnings"),
    ],
    worst: band(f64::INFINITY, 20, RatingGrade::VeryPoor, "Strong Sell", "Extremely overvalued or negative earnings"),
};

const PB_LADDER: Ladder = Ladder {
    direction: Direction::LowerIsBetter,
    bands: [
        band(1.0, 95, RatingGrade::Excellent, "Strong Buy", "Trading below book value - exceptional value"),
        band(1.5, 85, RatingGrade::VeryGood, "Buy", "Great value relative to assets"),
        band(2.5, 70, RatingGrade::Good, "Buy", "Reasonable price relative to book value"),
        band(3.5, 55, RatingGrade::Average, "Hold", "Moderately priced, consider timing"),
        band(5.0, 35, RatingGrade::Poor, "Avoid", "Expensive relative to tangible assets"),
    ],
    worst: band(f64::INFINITY, 20, RatingGrade::VeryPoor, "Strong Sell", "Severely overpriced relative to book value"),
};

const ROE_LADDER: Ladder = Ladder {
    direction: Direction::HigherIsBetter,
    bands: [
        band(0.25, 95, RatingGrade::Excellent, "Strong Buy", "Exceptional returns - highly profitable company"),
        band(0.20, 85, RatingGrade::VeryGood, "Buy", "Outstanding returns on shareholder equity"),
        band(0.15, 70, RatingGrade::Good, "Buy", "Strong returns indicate good management"),
        band(0.10, 55, RatingGrade::Average, "Hold", "Moderate returns, industry dependent"),
        band(0.05, 35, RatingGrade::Poor, "Avoid", "Weak returns on equity"),
    ],
    worst: band(f64::NEG_INFINITY, 20, RatingGrade::VeryPoor, "Strong Sell", "Very poor or negative returns"),
};

const CURRENT_RATIO_LADDER: Ladder = Ladder {
    direction: Direction::HigherIsBetter,
    bands: [
        band(2.5, 90, RatingGrade::Excellent, "Low Risk", "Excellent liquidity - very safe investment"),
        band(2.0, 80, RatingGrade::VeryGood, "Low Risk", "Strong liquidity position"),
        band(1.5, 70, RatingGrade::Good, "Medium Risk", "Adequate liquidity to meet obligations"),
        band(1.2, 55, RatingGrade::Average, "Medium Risk", "Moderate liquidity - monitor closely"),
        band(1.0, 40, RatingGrade::Poor, "High Risk", "Tight liquidity - financial stress possible"),
    ],
    worst: band(f64::NEG_INFINITY, 25, RatingGrade::VeryPoor, "Very High Risk", "Severe liquidity concerns"),
};

const DEBT_TO_EQUITY_LADDER: Ladder = Ladder {
    direction: Direction::LowerIsBetter,
    bands: [
        band(10.0, 95, RatingGrade::Excellent, "Low Risk", "Very conservative debt levels"),
        band(20.0, 85, RatingGrade::VeryGood, "Low Risk", "Conservative debt management"),
        band(40.0, 70, RatingGrade::Good, "Medium Risk", "Manageable debt levels"),
        band(60.0, 55, RatingGrade::Average, "Medium Risk", "Moderate debt burden - monitor"),
        band(80.0, 35, RatingGrade::Poor, "High Risk", "High debt levels - financial risk"),
    ],
    worst: band(f64::INFINITY, 20, RatingGrade::VeryPoor, "Very High Risk", "Excessive debt - avoid investment"),
};

fn ladder(metric: FundamentalMetric) -> &'static Ladder {
    match metric {
        FundamentalMetric::PriceToEarnings => &PE_LADDER,
        FundamentalMetric::PriceToBook => &PB_LADDER,
        FundamentalMetric::ReturnOnEquity => &ROE_LADDER,
        FundamentalMetric::CurrentRatio => &CURRENT_RATIO_LADDER,
        FundamentalMetric::DebtToEquity => &DEBT_TO_EQUITY_LADDER,
    }
}

impl Ladder {
    fn rate(&self, value: f64) -> &Band {
        let found = match self.direction {
            // A negative multiple means losses or negative equity, never cheapness.
            Direction::LowerIsBetter if value < 0.0 => None,
            Direction::LowerIsBetter => self.bands.iter().find(|b| value <= b.limit),
            Direction::HigherIsBetter => self.bands.iter().find(|b| value >= b.limit),
        };
        found.unwrap_or(&self.worst)
    }
}

/// Rate one ratio. Missing, zero or non-finite values are unrated (score 0).
pub fn rate_metric(metric: FundamentalMetric, value: Option<f64>) -> MetricRating {
    let usable = value.filter(|v| v.is_finite() && *v != 0.0);

    let Some(v) = usable else {
        return MetricRating {
            metric,
            value,
            score: 0,
            grade: RatingGrade::NotAvailable,
            color: RatingGrade::NotAvailable.color().to_string(),
            investment: "Insufficient Data".to_string(),
            reason: "Data not available for analysis".to_string(),
        };
    };

    let band = ladder(metric).rate(v);
    MetricRating {
        metric,
        value,
        score: band.score,
        grade: band.grade,
        color: band.grade.color().to_string(),
        investment: band.investment.to_string(),
        reason: band.reason.to_string(),
    }
}

/// Average the rated metrics into one verdict. Confidence grows with how
/// many of the five ratios were available, capped at 95.
pub fn overall_rating(ratings: &[MetricRating]) -> OverallRating {
    let scores: Vec<f64> = ratings
        .iter()
        .filter(|r| r.score > 0)
        .map(|r| f64::from(r.score))
        .collect();

    if scores.is_empty() {
        return OverallRating {
            score: 0.0,
            label: "Insufficient Data".to_string(),
            color: "gray".to_string(),
            investment: "Cannot Recommend".to_string(),
            confidence: 0.0,
        };
    }

    let score = scores.iter().sum::<f64>() / scores.len() as f64;
    let confidence = f64::min(
        95.0,
        scores.len() as f64 / FundamentalMetric::ALL.len() as f64 * 100.0,
    );

    let (label, color, investment) = if score >= 85.0 {
        ("Strong Buy", "emerald", "Excellent Investment Opportunity")
    } else if score >= 70.0 {
        ("Buy", "blue", "Good Investment Opportunity")
    } else if score >= 55.0 {
        ("Hold", "yellow", "Average Investment - Monitor")
    } else if score >= 40.0 {
        ("Avoid", "orange", "Below Average Investment")
    } else {
        ("Strong Sell", "red", "Poor Investment - High Risk")
    };

    OverallRating {
        score,
        label: label.to_string(),
        color: color.to_string(),
        investment: investment.to_string(),
        confidence,
    }
}

pub fn evaluate(symbol: &str, ratios: FundamentalRatios) -> Result<FundamentalReport, AppError> {
    let symbol = normalize_symbol(symbol)?;

    let ratings: Vec<MetricRating> = FundamentalMetric::ALL
        .iter()
        .map(|&metric| rate_metric(metric, metric.value_in(&ratios)))
        .collect();
    let overall = overall_rating(&ratings);

    info!(
        "Fundamental rating for {}: {} ({:.1}, confidence {:.0}%)",
        symbol, overall.label, overall.score, overall.confidence
    );

    Ok(FundamentalReport {
        symbol,
        ratios,
        ratings,
        overall,
    })
}
