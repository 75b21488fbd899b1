//! # FinTrace Graph
//!
//! The transaction graph every detector reads.
//!
//! ## Contents
//! - `Transaction`, `AccountNode`, `CsrGraph` - input rows, per-account aggregates, adjacency
//! - `GraphBuilder` / `TransactionGraph` - read-only directed multigraph over dense account indices
//! - `heuristic_risk` - activity-based display score, overridden by detector verdicts
//! - `GraphView` - node/link structure for visualization

#![warn(missing_docs)]

pub mod builder;
pub mod risk;
pub mod types;
pub mod view;

pub use builder::{GraphBuilder, TransactionGraph};
pub use risk::{heuristic_risk, RiskFlags, MAX_DISPLAY_RISK};
pub use types::{AccountNode, AggregatedEdge, CsrGraph, Transaction};
pub use view::{AccountRole, GraphView, ViewAnnotations, ViewNode};
