// Core modules
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod indicators;
pub mod models;
pub mod monitor;
pub mod report;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use api::{MarketDataSource, SyntheticSource, YahooClient};
pub use context::AnalysisContext;
pub use error::{DataError, EvaluationError, EvaluationResult};
pub use models::*;
pub use monitor::{FetchPlan, Monitor};
pub use strategy::{analyze, Analysis, StrategyConfig};
