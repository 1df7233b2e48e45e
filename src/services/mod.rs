pub mod ensemble;
pub mod failure_cache;
pub mod forecasting_service;
pub mod fundamental_service;
pub mod indicators;
pub mod model_metrics;
pub mod news_service;
pub mod predictor;
pub mod random_source;
pub mod strategy_advisor;
pub mod technical_signal_service;
pub mod technical_snapshot;
