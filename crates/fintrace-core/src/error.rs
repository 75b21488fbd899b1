//! Error types for FinTrace.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while building graphs or running detectors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    ValidationError(String),

    /// A detector used up its search budget before finishing.
    #[error("Search budget exhausted in {detector} after {expansions} expansions")]
    BudgetExhausted {
        /// Detector identifier.
        detector: String,
        /// Node expansions performed before stopping.
        expansions: u64,
    },

    /// A detector ran past its wall-clock allowance.
    #[error("Detector {detector} timed out after {elapsed:?}")]
    Timeout {
        /// Detector identifier.
        detector: String,
        /// Time spent before stopping.
        elapsed: Duration,
    },

    /// A detector failed; the rest of the analysis continues without it.
    #[error("Detector {detector} failed: {reason}")]
    DetectorFailed {
        /// Detector identifier.
        detector: String,
        /// Failure description.
        reason: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl EngineError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::ValidationError(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::InternalError(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::ConfigError(msg.into())
    }

    /// Create a detector failure.
    #[must_use]
    pub fn detector_failed(detector: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::DetectorFailed {
            detector: detector.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the search was cut short by its budget.
    ///
    /// Detectors treat these as "stop and keep what you found".
    #[must_use]
    pub fn is_budget_stop(&self) -> bool {
        matches!(
            self,
            EngineError::BudgetExhausted { .. } | EngineError::Timeout { .. }
        )
    }

    /// Returns true if this is a recoverable error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::BudgetExhausted { .. }
                | EngineError::Timeout { .. }
                | EngineError::ValidationError(_)
                | EngineError::DetectorFailed { .. }
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            EngineError::DeserializationError(err.to_string())
        } else {
            EngineError::SerializationError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_stop_classification() {
        let err = EngineError::BudgetExhausted {
            detector: "detection/cycles".to_string(),
            expansions: 10,
        };
        assert!(err.is_budget_stop());
        assert!(err.is_recoverable());

        let err = EngineError::internal("boom");
        assert!(!err.is_budget_stop());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::detector_failed("detection/shell-networks", "panicked");
        assert_eq!(
            err.to_string(),
            "Detector detection/shell-networks failed: panicked"
        );

        let err = EngineError::validation("missing column: amount");
        assert_eq!(
            err.to_string(),
            "Input validation failed: missing column: amount"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<Vec<u32>, _> = serde_json::from_str("[1, 2");
        let err: EngineError = parse.unwrap_err().into();
        assert!(matches!(err, EngineError::DeserializationError(_)));
    }
}
