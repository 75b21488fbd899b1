//! # FinTrace Detection
//!
//! Fraud ring detectors and the pipeline that runs them.
//!
//! ## Detectors
//! - `CycleDetector` - circular fund routing (3 to 5 accounts)
//! - `SmurfingDetector` - fan-in / fan-out structuring inside a 72h window
//! - `ShellNetworkDetector` - layering chains through low-activity accounts
//! - `KingpinScorer` - flow and centrality ranking
//!
//! `RiskAggregator` merges their findings into a `DetectionReport`;
//! `DetectionEngine` wires everything together.

#![warn(missing_docs)]

pub mod aggregator;
pub mod config;
pub mod cycles;
pub mod engine;
pub mod kingpin;
pub mod shell;
pub mod smurfing;
pub mod types;

pub use aggregator::RiskAggregator;
pub use config::{CycleConfig, EngineConfig, KingpinConfig, ShellConfig, SmurfingConfig};
pub use cycles::CycleDetector;
pub use engine::{DetectionEngine, DetectorStats, EngineOutput, RunStats};
pub use kingpin::KingpinScorer;
pub use shell::ShellNetworkDetector;
pub use smurfing::SmurfingDetector;
pub use types::{
    DetectionReport, FraudRing, KingpinCandidate, PatternType, PatternsBreakdown, SuspiciousAccountRecord,
    Summary,
};
