//! # FinTrace Core
//!
//! Core abstractions shared by the FinTrace detection crates.
//!
//! This crate provides:
//! - The engine error type and `Result` alias
//! - Detector metadata and the `Detector` / `BatchDetector` traits
//! - Search budgets that bound graph enumeration per detector call
//! - Logging configuration on top of `tracing-subscriber`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod detector;
pub mod error;
pub mod logging;
pub mod traits;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::budget::{BudgetTracker, SearchBudget};
    pub use crate::detector::DetectorMetadata;
    pub use crate::error::{EngineError, Result};
    pub use crate::logging::{LogConfig, LogFormat, LogLevel};
    pub use crate::traits::{BatchDetector, Detector};
}
