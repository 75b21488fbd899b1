//! # FinTrace
//!
//! Fraud ring detection over transaction graphs.
//!
//! FinTrace turns a list of money transfers into a directed account graph and
//! runs four detectors over it:
//!
//! - **Cycles**: money routed around a loop of 3 to 5 accounts
//! - **Smurfing**: 10+ counterparties funnelling into (fan-in) or out of
//!   (fan-out) one account inside 72 hours
//! - **Shell networks**: layering chains through accounts with only 2 or 3
//!   transactions
//! - **Kingpin**: the single account combining the most flow and reach
//!
//! Findings are merged into per-account risk scores and named fraud rings.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fintrace::prelude::*;
//!
//! let ingested = fintrace::ingest::read_path("transactions.csv")?;
//! let output = DetectionEngine::new().analyze(ingested.transactions)?;
//!
//! for ring in &output.report.fraud_rings {
//!     println!("{} {} {:?}", ring.ring_id, ring.pattern_type, ring.member_accounts);
//! }
//! ```
//!
//! ## Crates
//!
//! - [`core`]: errors, detector traits, search budgets, logging
//! - [`graph`]: graph construction, heuristic risk, visualization view
//! - [`detection`]: detectors, risk aggregation, the engine and its config

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use fintrace_core as core;
pub use fintrace_detection as detection;
pub use fintrace_graph as graph;

pub mod catalog;
pub mod demo;
pub mod ingest;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use fintrace::prelude::*;
/// ```
pub mod prelude {
    pub use fintrace_core::prelude::*;

    pub use fintrace_graph::{GraphBuilder, GraphView, Transaction, TransactionGraph};

    pub use fintrace_detection::{
        CycleDetector, DetectionEngine, DetectionReport, EngineConfig, EngineOutput, FraudRing,
        KingpinScorer, PatternType, RiskAggregator, ShellNetworkDetector, SmurfingDetector,
        SuspiciousAccountRecord,
    };

    pub use crate::ingest::{read_csv, read_json, read_path, Ingested};
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
