use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad period, unknown strategy id, malformed descriptor. A caller bug.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Raised by market-data collaborators; never clears existing chart state.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// An async result that arrived after the session moved on. Dropped silently.
    #[error("Stale response: expected generation {expected}, got {got}")]
    StaleResponse { expected: u64, got: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    /// A market-data payload (e.g. an exchange kline array) with a bad row.
    #[error("Payload format error: {0}")]
    PayloadFormatError(String),

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidParameter(msg.into())
    }

    /// Failures that should leave the current chart untouched and be retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::NetworkError(_) | EngineError::StaleResponse { .. } | EngineError::IoError { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
