//! Circular fund routing.
//!
//! Enumerates simple directed cycles of bounded length with an iterative DFS.
//! Each account serves as a DFS root once and is then excluded from later
//! trees. No cycle is lost by this: the first of its members used as a root
//! reaches every other member along the cycle before any of them is excluded.

use crate::config::CycleConfig;
use crate::types::{CycleFindings, CyclePattern};
use fintrace_core::budget::BudgetTracker;
use fintrace_core::detector::DetectorMetadata;
use fintrace_core::error::Result;
use fintrace_core::traits::{BatchDetector, Detector};
use fintrace_graph::TransactionGraph;
use std::collections::HashSet;

/// Cycle detection kernel.
#[derive(Debug, Clone)]
pub struct CycleDetector {
    metadata: DetectorMetadata,
    config: CycleConfig,
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleDetector {
    /// Create a detector with default bounds (3 to 5 accounts).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CycleConfig::default())
    }

    /// Create a detector with custom bounds.
    #[must_use]
    pub fn with_config(config: CycleConfig) -> Self {
        Self {
            metadata: DetectorMetadata::enumeration("detection/cycles")
                .with_description("Circular fund routing via bounded DFS"),
            config,
        }
    }

    /// Detector configuration.
    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Find cycles, stopping early if the budget runs out.
    pub fn find_cycles(&self, graph: &TransactionGraph, budget: &mut BudgetTracker) -> CycleFindings {
        let n = graph.num_accounts();
        let max_len = self.config.max_length;

        let mut findings = CycleFindings::default();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut retired = vec![false; n];
        // Position of each account on the current path
        let mut on_path: Vec<Option<usize>> = vec![None; n];
        let mut path: Vec<usize> = Vec::with_capacity(max_len);
        // (account, next neighbour cursor)
        let mut stack: Vec<(usize, usize)> = Vec::with_capacity(max_len);

        'roots: for root in 0..n {
            if budget.tick().is_err() {
                findings.truncated = true;
                break;
            }

            path.push(root);
            on_path[root] = Some(0);
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                let neighbors = graph.successors(node);

                if cursor >= neighbors.len() {
                    stack.pop();
                    path.pop();
                    on_path[node] = None;
                    continue;
                }
                frame.1 += 1;

                let next = neighbors[cursor];
                if let Some(pos) = on_path[next] {
                    let cycle = &path[pos..];
                    if (self.config.min_length..=max_len).contains(&cycle.len()) {
                        let key = canonical_key(graph, cycle);
                        if seen.insert(key) {
                            findings.cycles.push(emitted_cycle(graph, cycle));
                        }
                    }
                } else if path.len() < max_len && !retired[next] {
                    if budget.tick().is_err() {
                        findings.truncated = true;
                        break 'roots;
                    }
                    path.push(next);
                    on_path[next] = Some(path.len() - 1);
                    stack.push((next, 0));
                }
            }

            retired[root] = true;
        }

        tracing::debug!(
            cycles = findings.cycles.len(),
            expansions = budget.expansions(),
            truncated = findings.truncated,
            "Cycle search finished"
        );
        findings
    }
}

impl Detector for CycleDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}

impl BatchDetector<TransactionGraph, CycleFindings> for CycleDetector {
    fn detect(&self, graph: &TransactionGraph, budget: &mut BudgetTracker) -> Result<CycleFindings> {
        Ok(self.find_cycles(graph, budget))
    }
}

/// Position of the lexicographically smallest account ID.
fn min_position(graph: &TransactionGraph, cycle: &[usize]) -> usize {
    cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| graph.account_id(**a).cmp(graph.account_id(**b)))
        .map_or(0, |(pos, _)| pos)
}

/// Dedup key: the cycle read forward or backward from its smallest ID,
/// whichever sequence of IDs compares lower.
///
/// Rotations and mirror images of one cycle share a key.
fn canonical_key(graph: &TransactionGraph, cycle: &[usize]) -> Vec<usize> {
    let start = min_position(graph, cycle);
    let len = cycle.len();

    let forward: Vec<usize> = (0..len).map(|i| cycle[(start + i) % len]).collect();
    let backward: Vec<usize> = (0..len).map(|i| cycle[(start + len - i) % len]).collect();

    if id_sequence(graph, &backward) < id_sequence(graph, &forward) {
        backward
    } else {
        forward
    }
}

fn id_sequence<'g>(graph: &'g TransactionGraph, seq: &[usize]) -> Vec<&'g str> {
    seq.iter().map(|&a| graph.account_id(a)).collect()
}

/// Cycle as reported: starts at the smallest ID, follows edge direction.
fn emitted_cycle(graph: &TransactionGraph, cycle: &[usize]) -> CyclePattern {
    let start = min_position(graph, cycle);
    let len = cycle.len();
    CyclePattern {
        members: (0..len)
            .map(|i| graph.account_id(cycle[(start + i) % len]).to_string())
            .collect(),
    }
}
