mod forecast;
mod fundamental;
mod news;
mod strategy;
mod technical;

pub use forecast::{
    ArchetypeRun, FeatureImportance, ForecastReport, Horizon, MarketFactors, ModelArchetype,
    ModelParams, ModelSelection, PerformanceMetrics, PredictionPoint, Trend, ENSEMBLE_PARAMS,
};
pub use fundamental::{
    FundamentalMetric, FundamentalRatios, FundamentalReport, MetricRating, OverallRating,
    RatingGrade,
};
pub use news::{NewsItem, NewsSentiment};
pub use strategy::{ModelRationale, StrategyVerdict, Verdict};
pub use technical::{
    HistoricalSeries, IndicatorSignal, MacdReading, SignalKind, SignalStrength, TechnicalDecision,
    TechnicalReport, TechnicalSnapshot,
};
