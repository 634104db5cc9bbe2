//! Unified error hierarchy for readyrs
//!
//! Separates "no data exists" from "the upstream feed could not be reached" so
//! callers can tell "try later" apart from "nothing to score". The scoring,
//! baseline and verdict code never sees a transport error: the fetch layer
//! converts everything into one of the variants below.

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level error type for all readyrs operations
#[derive(Debug, Error)]
pub enum ReadyRsError {
    /// The fetched window is empty or the requested day is absent from it
    #[error("No data available for {date}: {reason}")]
    DataUnavailable { date: NaiveDate, reason: String },

    /// The upstream feed was unreachable or answered with garbage
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    /// Missing credential, malformed date range, inconsistent thresholds
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Notification sink refused or failed to accept a message
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// IO errors (offline exports, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding of local files
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Transport-level failures talking to the upstream wellness API
#[derive(Debug, Error)]
pub enum ConnectivityError {
    /// Host could not be reached (DNS, TLS, refused connection, timeout)
    #[error("Upstream unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Response arrived but the body could not be decoded
    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
}

/// Result type alias for readyrs operations
pub type Result<T> = std::result::Result<T, ReadyRsError>;

impl ReadyRsError {
    /// Shorthand for the "insufficient data" outcome
    pub fn no_data(date: NaiveDate, reason: impl Into<String>) -> Self {
        ReadyRsError::DataUnavailable {
            date,
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReadyRsError::Connectivity(_) | ReadyRsError::Io(_))
    }

    /// True for the "nothing to score" outcome
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, ReadyRsError::DataUnavailable { .. })
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReadyRsError::DataUnavailable { .. } => ErrorSeverity::Warning,
            ReadyRsError::Delivery(_) => ErrorSeverity::Warning,
            ReadyRsError::Connectivity(_) => ErrorSeverity::Error,
            ReadyRsError::Configuration(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ReadyRsError::DataUnavailable { date, reason } => {
                format!("Not enough data for {} ({}).", date.format("%d-%m-%Y"), reason)
            }
            ReadyRsError::Connectivity(_) => {
                "Unable to reach the wellness service. Please try again later.".to_string()
            }
            ReadyRsError::Configuration(reason) => {
                format!("Configuration problem: {}", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Startup cannot continue
    Critical,
    /// Request failed, process can continue
    Error,
    /// Degraded result, not a failure
    Warning,
}
