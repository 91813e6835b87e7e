//! Error handling for the gatecheck engine
//!
//! Probe failures are data, not errors: every network failure inside a probe is
//! folded into its `ProbeResult`. This type only covers the few fallible edges
//! around the engine (target parsing, configuration, report output).

use thiserror::Error;

/// Main error type for engine operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Timeout error")]
    TimeoutError,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Task failed: {0}")]
    TaskError(String),
}

/// Result type alias for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::OutputError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            ScanError::TaskError("worker panicked".to_string())
        } else {
            ScanError::TaskError("worker cancelled".to_string())
        }
    }
}
