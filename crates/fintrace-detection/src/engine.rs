//! Detection pipeline.
//!
//! GraphBuilder, then the four detectors over the same read-only graph, then
//! the RiskAggregator. Each detector runs isolated: an error or a panic in
//! one of them is logged and replaced by empty findings, so one broken rule
//! degrades the report instead of failing the analysis.
//!
//! # Example
//!
//! ```rust,ignore
//! use fintrace_detection::engine::DetectionEngine;
//!
//! let engine = DetectionEngine::new();
//! let output = engine.analyze(transactions)?;
//! println!("{}", serde_json::to_string_pretty(&output.report)?);
//! ```

use crate::aggregator::RiskAggregator;
use crate::config::EngineConfig;
use crate::cycles::CycleDetector;
use crate::kingpin::KingpinScorer;
use crate::shell::ShellNetworkDetector;
use crate::smurfing::SmurfingDetector;
use crate::types::{DetectionReport, Findings};
use chrono::{DateTime, Utc};
use fintrace_core::budget::{BudgetTracker, SearchBudget};
use fintrace_core::detector::DetectorMetadata;
use fintrace_core::error::{EngineError, Result};
use fintrace_core::traits::BatchDetector;
use fintrace_graph::{GraphBuilder, GraphView, Transaction, TransactionGraph};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{Dispatch, Span};
use uuid::Uuid;

/// Outcome of one detector call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorStats {
    /// Detector ID.
    pub detector: String,
    /// Wall-clock time in microseconds.
    pub elapsed_us: u64,
    /// Node expansions charged to the budget.
    pub expansions: u64,
    /// Patterns found.
    pub findings: usize,
    /// Stopped early on its budget.
    pub truncated: bool,
    /// Errored or panicked; its findings were dropped.
    pub failed: bool,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Unique run ID.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Transactions in the graph.
    pub transactions: usize,
    /// Accounts in the graph.
    pub accounts: usize,
    /// Whether detectors ran concurrently.
    pub parallel: bool,
    /// Total time in microseconds, aggregation included.
    pub total_us: u64,
    /// Per-detector outcomes, in merge order.
    pub detectors: Vec<DetectorStats>,
}

impl RunStats {
    /// Whether any detector stopped on its budget.
    #[must_use]
    pub fn any_truncated(&self) -> bool {
        self.detectors.iter().any(|d| d.truncated)
    }

    /// Whether any detector failed.
    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.detectors.iter().any(|d| d.failed)
    }

    /// Stats for one detector ID.
    pub fn detector(&self, id: &str) -> Option<&DetectorStats> {
        self.detectors.iter().find(|d| d.detector == id)
    }
}

/// Report plus run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Detection report.
    pub report: DetectionReport,
    /// How the run went.
    pub stats: RunStats,
}

impl EngineOutput {
    /// Visualization view of `graph` annotated with this report.
    ///
    /// `graph` must be the graph the report was produced from.
    pub fn graph_view(&self, graph: &TransactionGraph) -> GraphView {
        GraphView::build(graph, &self.report.view_annotations())
    }
}

/// The detection engine.
#[derive(Debug, Clone)]
pub struct DetectionEngine {
    config: EngineConfig,
    cycles: CycleDetector,
    smurfing: SmurfingDetector,
    shell: ShellNetworkDetector,
    kingpin: KingpinScorer,
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionEngine {
    /// Create an engine with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Create an engine from a configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            cycles: CycleDetector::with_config(config.cycles.clone()),
            smurfing: SmurfingDetector::with_config(config.smurfing.clone()),
            shell: ShellNetworkDetector::with_config(config.shell.clone()),
            kingpin: KingpinScorer::with_config(config.kingpin.clone()),
            config,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the graph and analyze it.
    ///
    /// Defective rows are dropped with a warning.
    pub fn analyze(&self, transactions: Vec<Transaction>) -> Result<EngineOutput> {
        let graph = GraphBuilder::new().build(transactions)?;
        Ok(self.analyze_graph(&graph))
    }

    /// Analyze an already built graph.
    pub fn analyze_graph(&self, graph: &TransactionGraph) -> EngineOutput {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let span = tracing::info_span!("analysis", %run_id);
        let _enter = span.enter();
        let scope = RunScope::current();
        tracing::info!(
            transactions = graph.num_transactions(),
            accounts = graph.num_accounts(),
            parallel = self.config.parallel,
            "Starting analysis"
        );

        let ((cycles, smurfing), (shell, kingpin)) = if self.config.parallel {
            rayon::join(
                || {
                    rayon::join(
                        || self.run(&self.cycles, graph, &scope),
                        || self.run(&self.smurfing, graph, &scope),
                    )
                },
                || {
                    rayon::join(
                        || self.run(&self.shell, graph, &scope),
                        || self.run(&self.kingpin, graph, &scope),
                    )
                },
            )
        } else {
            (
                (self.run(&self.cycles, graph, &scope), self.run(&self.smurfing, graph, &scope)),
                (self.run(&self.shell, graph, &scope), self.run(&self.kingpin, graph, &scope)),
            )
        };

        let report = RiskAggregator::aggregate(graph.num_accounts(), &cycles.0, &smurfing.0, &shell.0, &kingpin.0);

        let stats = RunStats {
            run_id,
            started_at,
            transactions: graph.num_transactions(),
            accounts: graph.num_accounts(),
            parallel: self.config.parallel,
            total_us: elapsed_us(start),
            detectors: vec![cycles.1, smurfing.1, shell.1, kingpin.1],
        };

        tracing::info!(
            suspicious = report.summary.suspicious_accounts_flagged,
            rings = report.summary.fraud_rings_detected,
            kingpin = report.kingpin.as_ref().map(|k| k.account_id.as_str()),
            elapsed_us = stats.total_us,
            "Analysis complete"
        );

        EngineOutput { report, stats }
    }

    /// Enumerating detectors get the configured budget; scans are linear and
    /// run unbounded.
    fn budget_for(&self, metadata: &DetectorMetadata) -> SearchBudget {
        if metadata.search.is_enumeration() {
            self.config.budget.clone()
        } else {
            SearchBudget::unlimited()
        }
    }

    /// Run one detector in isolation, under the run's span and subscriber
    /// even when called on a rayon worker.
    fn run<D, O>(&self, detector: &D, graph: &TransactionGraph, scope: &RunScope) -> (O, DetectorStats)
    where
        D: BatchDetector<TransactionGraph, O>,
        O: Findings,
    {
        tracing::dispatcher::with_default(&scope.dispatch, || {
            let span = tracing::info_span!(parent: &scope.span, "detector", detector = %detector.id());
            let _enter = span.enter();
            self.run_isolated(detector, graph)
        })
    }

    fn run_isolated<D, O>(&self, detector: &D, graph: &TransactionGraph) -> (O, DetectorStats)
    where
        D: BatchDetector<TransactionGraph, O>,
        O: Findings,
    {
        let id = detector.id().to_string();

        let start = Instant::now();
        let mut tracker = BudgetTracker::new(id.clone(), self.budget_for(detector.metadata()));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<O> {
            detector.validate()?;
            detector.validate_input(graph)?;
            detector.detect(graph, &mut tracker)
        }));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(EngineError::detector_failed(&id, panic_message(payload.as_ref()))),
        };

        let mut stats = DetectorStats {
            detector: id,
            elapsed_us: elapsed_us(start),
            expansions: tracker.expansions(),
            ..Default::default()
        };

        match result {
            Ok(findings) => {
                stats.findings = findings.len();
                stats.truncated = findings.is_truncated();
                if stats.truncated {
                    tracing::warn!(
                        expansions = stats.expansions,
                        findings = stats.findings,
                        "Detector stopped on its search budget, findings are partial"
                    );
                } else {
                    tracing::debug!(findings = stats.findings, elapsed_us = stats.elapsed_us, "Detector finished");
                }
                (findings, stats)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Detector failed, continuing without its findings");
                stats.failed = true;
                stats.error = Some(err.to_string());
                (O::default(), stats)
            }
        }
    }
}

/// Span and subscriber of one analysis run.
///
/// Rayon workers have neither the caller's current span nor a scoped
/// subscriber, so both are handed to every detector call explicitly.
struct RunScope {
    span: Span,
    dispatch: Dispatch,
}

impl RunScope {
    fn current() -> Self {
        Self {
            span: Span::current(),
            dispatch: tracing::dispatcher::get_default(Dispatch::clone),
        }
    }
}

fn elapsed_us(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CycleFindings, PatternType};
    use chrono::{Duration, TimeZone};
    use fintrace_core::traits::Detector;
    use std::sync::{Arc, Mutex};
    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    /// Records (span name, parent span name) for every new span.
    #[derive(Clone, Default)]
    struct SpanParents(Arc<Mutex<Vec<(String, Option<String>)>>>);

    impl<S> Layer<S> for SpanParents
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, _attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
            if let Some(span) = ctx.span(id) {
                let parent = span.parent().map(|p| p.name().to_string());
                self.0.lock().unwrap().push((span.name().to_string(), parent));
            }
        }
    }

    fn tx(id: usize, from: &str, to: &str, amount: f64, minutes: i64) -> Transaction {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        Transaction::new(format!("T{}", id), from, to, amount, base + Duration::minutes(minutes))
    }

    fn ring_case() -> Vec<Transaction> {
        let mut txs = vec![
            tx(0, "A1", "A2", 5_000.0, 0),
            tx(1, "A2", "A3", 5_000.0, 1),
            tx(2, "A3", "A4", 5_000.0, 2),
            tx(3, "A4", "A5", 5_000.0, 3),
            tx(4, "A5", "A1", 5_000.0, 4),
        ];
        for i in 0..10 {
            txs.push(tx(10 + i, &format!("S{}", i), "R", 900.0, i as i64 * 5));
        }
        txs
    }

    #[derive(Debug)]
    struct PanickingDetector {
        metadata: DetectorMetadata,
    }

    impl Detector for PanickingDetector {
        fn metadata(&self) -> &DetectorMetadata {
            &self.metadata
        }
    }

    impl BatchDetector<TransactionGraph, CycleFindings> for PanickingDetector {
        fn detect(&self, _graph: &TransactionGraph, _budget: &mut BudgetTracker) -> Result<CycleFindings> {
            panic!("index out of bounds")
        }
    }

    #[test]
    fn test_empty_input() {
        let output = DetectionEngine::new().analyze(Vec::new()).unwrap();

        assert!(output.report.suspicious_accounts.is_empty());
        assert!(output.report.fraud_rings.is_empty());
        assert!(output.report.kingpin.is_none());
        assert_eq!(output.stats.detectors.len(), 4);
        assert!(!output.stats.any_failed());
    }

    #[test]
    fn test_single_account_input() {
        let output = DetectionEngine::new().analyze(vec![tx(0, "A", "A", 10.0, 0)]).unwrap();

        assert_eq!(output.report.summary.total_accounts_analyzed, 1);
        assert!(output.report.fraud_rings.is_empty());
        assert!(output.report.kingpin.is_none());
    }

    #[test]
    fn test_cycle_and_fan_in() {
        let output = DetectionEngine::new().analyze(ring_case()).unwrap();
        let report = &output.report;

        assert_eq!(report.summary.patterns_breakdown.cycles, 1);
        assert_eq!(report.summary.patterns_breakdown.fan_in, 1);
        assert_eq!(report.fraud_rings[0].pattern_type, PatternType::Cycle);
        assert_eq!(report.fraud_rings[0].ring_id, "RING_001");
        assert_eq!(report.fraud_rings[0].risk_score, 95);
        assert_eq!(report.fraud_rings[1].member_accounts.len(), 11);
        assert_eq!(report.summary.suspicious_accounts_flagged, 16);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let parallel = DetectionEngine::with_config(EngineConfig::default().with_parallel(true))
            .unwrap()
            .analyze(ring_case())
            .unwrap();
        let sequential = DetectionEngine::with_config(EngineConfig::default().with_parallel(false))
            .unwrap()
            .analyze(ring_case())
            .unwrap();

        assert_eq!(parallel.report, sequential.report);
        assert_ne!(parallel.stats.run_id, sequential.stats.run_id);
    }

    #[test]
    fn test_scans_run_unbounded() {
        let config = EngineConfig::default().with_budget(SearchBudget::default().with_max_expansions(1));
        let output = DetectionEngine::with_config(config).unwrap().analyze(ring_case()).unwrap();

        assert!(output.stats.detector("detection/cycles").unwrap().truncated);
        assert!(!output.stats.detector("detection/smurfing").unwrap().truncated);
        assert_eq!(output.report.summary.patterns_breakdown.fan_in, 1);
    }

    #[test]
    fn test_panicking_detector_is_isolated() {
        let engine = DetectionEngine::new();
        let graph = TransactionGraph::build(ring_case());
        let detector = PanickingDetector {
            metadata: DetectorMetadata::enumeration("test/panics"),
        };

        let (findings, stats) = engine.run(&detector, &graph, &RunScope::current());
        assert!(findings.cycles.is_empty());
        assert!(stats.failed);
        assert!(stats.error.unwrap().contains("index out of bounds"));
    }

    #[test]
    fn test_detector_spans_nest_under_analysis() {
        for parallel in [false, true] {
            let recorded = SpanParents::default();
            let subscriber = tracing_subscriber::registry().with(recorded.clone());
            let engine = DetectionEngine::with_config(EngineConfig::default().with_parallel(parallel)).unwrap();

            tracing::subscriber::with_default(subscriber, || engine.analyze(ring_case()).unwrap());

            let spans = recorded.0.lock().unwrap();
            let detectors: Vec<_> = spans.iter().filter(|(name, _)| name == "detector").collect();
            assert_eq!(detectors.len(), 4, "parallel = {}", parallel);
            for (_, parent) in detectors {
                assert_eq!(parent.as_deref(), Some("analysis"), "parallel = {}", parallel);
            }
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.cycles.max_length = 2;
        assert!(DetectionEngine::with_config(config).is_err());
    }

    #[test]
    fn test_graph_view_from_output() {
        let engine = DetectionEngine::new();
        let graph = TransactionGraph::build(ring_case());
        let output = engine.analyze_graph(&graph);
        let view = output.graph_view(&graph);

        assert_eq!(view.nodes.len(), graph.num_accounts());
        assert!(view.node("A1").unwrap().suspicious);
        assert_eq!(view.node("R").unwrap().rings.len(), 1);
    }
}
