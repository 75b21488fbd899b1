//! Detection types: detector findings, rings and the final report.

use chrono::{DateTime, Utc};
use fintrace_graph::ViewAnnotations;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Risk of a cycle ring before adding its length.
pub const CYCLE_BASE_RISK: u32 = 90;
/// Risk of every fan-in / fan-out ring.
pub const SMURFING_RISK: u32 = 85;
/// Risk of every shell-network ring.
pub const SHELL_RISK: u32 = 75;

// ============================================================================
// Pattern Types
// ============================================================================

/// Fraud pattern a ring exhibits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternType {
    /// Circular fund routing.
    #[serde(rename = "cycle")]
    Cycle,
    /// Many senders into one receiver.
    #[serde(rename = "fan-in")]
    FanIn,
    /// One sender out to many receivers.
    #[serde(rename = "fan-out")]
    FanOut,
    /// Layering chain through shell accounts.
    #[serde(rename = "shell-network")]
    ShellNetwork,
}

impl PatternType {
    /// Wire name of the pattern.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PatternType::Cycle => "cycle",
            PatternType::FanIn => "fan-in",
            PatternType::FanOut => "fan-out",
            PatternType::ShellNetwork => "shell-network",
        }
    }

    /// Reason recorded on accounts flagged by this pattern.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            PatternType::Cycle => "cycle",
            PatternType::FanIn => "fan-in",
            PatternType::FanOut => "fan-out",
            PatternType::ShellNetwork => "shell",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of a detector, as seen by the engine.
pub trait Findings: Default + Send {
    /// Number of patterns found.
    fn len(&self) -> usize;

    /// Whether nothing was found.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the search stopped early on its budget.
    fn is_truncated(&self) -> bool {
        false
    }
}

// ============================================================================
// Cycles
// ============================================================================

/// A simple directed cycle.
///
/// `members` starts at the lexicographically smallest account ID and follows
/// edge direction; the last member sends back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePattern {
    /// Accounts on the cycle.
    pub members: Vec<String>,
}

impl CyclePattern {
    /// Number of accounts on the cycle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cycle has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ring risk: longer cycles score higher.
    #[must_use]
    pub fn risk_score(&self) -> u32 {
        CYCLE_BASE_RISK + self.members.len() as u32
    }

    /// Ring details text.
    pub fn details(&self) -> String {
        format!("{}-node circular routing", self.members.len())
    }
}

/// Cycle detector output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleFindings {
    /// Distinct cycles in discovery order.
    pub cycles: Vec<CyclePattern>,
    /// Search stopped on its budget.
    pub truncated: bool,
}

impl Findings for CycleFindings {
    fn len(&self) -> usize {
        self.cycles.len()
    }

    fn is_truncated(&self) -> bool {
        self.truncated
    }
}

// ============================================================================
// Smurfing
// ============================================================================

/// A fan-in or fan-out structuring pattern around one anchor account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmurfingPattern {
    /// `FanIn` or `FanOut`.
    pub pattern_type: PatternType,
    /// Receiver for fan-in, sender for fan-out.
    pub anchor: String,
    /// Distinct counterparties in the window, first-seen order.
    pub counterparties: Vec<String>,
    /// First transaction of the window.
    pub window_start: DateTime<Utc>,
    /// Inclusive end of the window.
    pub window_end: DateTime<Utc>,
    /// Transactions inside the window.
    pub transaction_count: usize,
}

impl SmurfingPattern {
    /// Anchor followed by counterparties.
    pub fn members(&self) -> Vec<String> {
        std::iter::once(self.anchor.clone())
            .chain(self.counterparties.iter().cloned())
            .collect()
    }

    /// Window length in whole hours.
    #[must_use]
    pub fn window_hours(&self) -> i64 {
        (self.window_end - self.window_start).num_hours()
    }

    /// Ring details text.
    pub fn details(&self) -> String {
        let n = self.counterparties.len();
        let hours = self.window_hours();
        match self.pattern_type {
            PatternType::FanOut => format!("1 sender → {} receivers in {}h", n, hours),
            _ => format!("{} senders → 1 receiver in {}h", n, hours),
        }
    }
}

/// Smurfing detector output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmurfingFindings {
    /// Fan-in patterns, one per receiver at most.
    pub fan_in: Vec<SmurfingPattern>,
    /// Fan-out patterns, one per sender at most.
    pub fan_out: Vec<SmurfingPattern>,
}

impl Findings for SmurfingFindings {
    fn len(&self) -> usize {
        self.fan_in.len() + self.fan_out.len()
    }
}

// ============================================================================
// Shell Networks
// ============================================================================

/// A layering chain whose intermediates are low-activity shell accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellChain {
    /// Accounts along the chain, in edge direction.
    pub path: Vec<String>,
}

impl ShellChain {
    /// Accounts between the two endpoints.
    pub fn intermediates(&self) -> &[String] {
        if self.path.len() < 2 {
            return &[];
        }
        &self.path[1..self.path.len() - 1]
    }

    /// Ring details text.
    pub fn details(&self) -> String {
        format!("{}-hop layering chain", self.path.len())
    }
}

/// Shell network detector output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellFindings {
    /// Accepted chains, longest first.
    pub chains: Vec<ShellChain>,
    /// Search stopped on its budget.
    pub truncated: bool,
}

impl Findings for ShellFindings {
    fn len(&self) -> usize {
        self.chains.len()
    }

    fn is_truncated(&self) -> bool {
        self.truncated
    }
}

// ============================================================================
// Kingpin
// ============================================================================

/// The account most likely to control the detected flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KingpinCandidate {
    /// Account ID.
    pub account_id: String,
    /// Sent plus received.
    pub total_flow: f64,
    /// Sum sent.
    pub total_sent: f64,
    /// Sum received.
    pub total_received: f64,
    /// Distinct counterparties.
    pub connections: usize,
    /// `connections / (accounts - 1)`.
    pub degree_centrality: f64,
    /// Combined flow/centrality score.
    #[serde(skip)]
    pub score: f64,
}

/// Kingpin scorer output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KingpinFindings {
    /// Selected account, if any was eligible.
    pub kingpin: Option<KingpinCandidate>,
    /// Accounts that met the connection threshold.
    pub eligible: usize,
}

impl Findings for KingpinFindings {
    fn len(&self) -> usize {
        usize::from(self.kingpin.is_some())
    }
}

// ============================================================================
// Report
// ============================================================================

/// A named group of accounts exhibiting one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRing {
    /// `RING_001`, `RING_002`, ...
    pub ring_id: String,
    /// Pattern the ring exhibits.
    pub pattern_type: PatternType,
    /// Member accounts.
    pub member_accounts: Vec<String>,
    /// Ring risk.
    pub risk_score: u32,
    /// Short human-readable description.
    pub details: String,
}

/// One flagged account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousAccountRecord {
    /// Account ID.
    pub account_id: String,
    /// Risk in `[0, 99]`.
    pub risk_score: u32,
    /// Distinct reasons, in the order they were first recorded.
    pub reasons: Vec<String>,
    /// Number of distinct reasons.
    pub patterns_detected: usize,
}

/// Ring counts per pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternsBreakdown {
    /// Cycle rings.
    pub cycles: usize,
    /// Fan-in rings.
    pub fan_in: usize,
    /// Fan-out rings.
    pub fan_out: usize,
    /// Shell-network rings.
    pub shell_networks: usize,
}

/// Report totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Distinct accounts in the input.
    pub total_accounts_analyzed: usize,
    /// Accounts in `suspicious_accounts`.
    pub suspicious_accounts_flagged: usize,
    /// Rings in `fraud_rings`.
    pub fraud_rings_detected: usize,
    /// Ring counts per pattern.
    pub patterns_breakdown: PatternsBreakdown,
}

/// Final output of one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Flagged accounts, highest risk first.
    pub suspicious_accounts: Vec<SuspiciousAccountRecord>,
    /// Rings, highest risk first.
    pub fraud_rings: Vec<FraudRing>,
    /// Totals.
    pub summary: Summary,
    /// Selected kingpin, or null.
    pub kingpin: Option<KingpinCandidate>,
}

impl DetectionReport {
    /// Accounts at or above `threshold`.
    #[must_use]
    pub fn high_risk_count(&self, threshold: u32) -> usize {
        self.suspicious_accounts
            .iter()
            .filter(|a| a.risk_score >= threshold)
            .count()
    }

    /// Ring IDs per account, in ring order.
    pub fn ring_membership(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for ring in &self.fraud_rings {
            for account in &ring.member_accounts {
                map.entry(account.clone())
                    .or_default()
                    .push(ring.ring_id.clone());
            }
        }
        map
    }

    /// Look up a flagged account.
    pub fn suspicious_account(&self, account_id: &str) -> Option<&SuspiciousAccountRecord> {
        self.suspicious_accounts
            .iter()
            .find(|a| a.account_id == account_id)
    }

    /// Verdicts for annotating a graph view.
    pub fn view_annotations(&self) -> ViewAnnotations {
        ViewAnnotations {
            suspicious: self
                .suspicious_accounts
                .iter()
                .map(|a| a.account_id.clone())
                .collect(),
            kingpin: self.kingpin.as_ref().map(|k| k.account_id.clone()),
            ring_membership: self.ring_membership(),
        }
    }

    /// Rings of one pattern.
    pub fn rings_of(&self, pattern: PatternType) -> impl Iterator<Item = &FraudRing> + '_ {
        self.fraud_rings
            .iter()
            .filter(move |r| r.pattern_type == pattern)
    }
}
