use thiserror::Error;

/// Failures reported by a market data source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no bars returned for {symbol} ({interval})")]
    Empty { symbol: String, interval: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Terminal failure of one evaluation
///
/// Each variant maps to a distinct pipeline stage so callers can tell them
/// apart. An evaluation yields either a complete result or one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("{resolution} data unavailable: {reason}")]
    DataUnavailable { resolution: String, reason: String },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("no trading session has at least {min_bars} bars")]
    NoSessionData { min_bars: usize },

    #[error("{0}")]
    Other(String),
}

impl EvaluationError {
    /// Classify a fetch failure for one resolution
    ///
    /// Unreachable, throttled, unknown or empty sources make the data
    /// unavailable; a malformed or otherwise unexpected response is a
    /// generic failure.
    pub fn from_fetch(resolution: &str, err: DataError) -> Self {
        match err {
            DataError::ResponseFormatChanged(_) | DataError::Other(_) => {
                EvaluationError::Other(format!("{} fetch failed: {}", resolution, err))
            }
            DataError::NetworkUnreachable(_)
            | DataError::RateLimited { .. }
            | DataError::SymbolNotFound { .. }
            | DataError::Empty { .. } => Self::data_unavailable(resolution, err),
        }
    }

    pub fn data_unavailable(resolution: &str, err: DataError) -> Self {
        EvaluationError::DataUnavailable {
            resolution: resolution.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type EvaluationResult<T> = std::result::Result<T, EvaluationError>;
