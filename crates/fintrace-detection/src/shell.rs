//! Layered shell networks.
//!
//! A layering chain is a simple directed path whose intermediate accounts
//! each have a dataset-wide transaction count inside the shell range. The
//! DFS only extends a path from its start or from a shell account, so every
//! path it reaches with enough nodes is a valid candidate.

use crate::config::ShellConfig;
use crate::types::{ShellChain, ShellFindings};
use fintrace_core::budget::BudgetTracker;
use fintrace_core::detector::DetectorMetadata;
use fintrace_core::error::Result;
use fintrace_core::traits::{BatchDetector, Detector};
use fintrace_graph::TransactionGraph;
use std::collections::HashSet;

/// Shell network detection kernel.
///
/// Candidates are collected first and then accepted longest-first: a chain
/// is dropped if it is a contiguous piece of a chain already accepted. This
/// reports the containing path instead of whichever fragment was found first.
#[derive(Debug, Clone)]
pub struct ShellNetworkDetector {
    metadata: DetectorMetadata,
    config: ShellConfig,
}

impl Default for ShellNetworkDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellNetworkDetector {
    /// Create a detector with default bounds (3 to 6 accounts, shells at 2-3 transactions).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default())
    }

    /// Create a detector with custom bounds.
    #[must_use]
    pub fn with_config(config: ShellConfig) -> Self {
        Self {
            metadata: DetectorMetadata::enumeration("detection/shell-networks")
                .with_description("Layering chains through low-activity accounts"),
            config,
        }
    }

    /// Detector configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Find chains, stopping early if the budget runs out.
    pub fn find_chains(&self, graph: &TransactionGraph, budget: &mut BudgetTracker) -> ShellFindings {
        let (candidates, truncated) = self.collect_candidates(graph, budget);
        let chains = self.accept(candidates);

        let findings = ShellFindings {
            chains: chains
                .into_iter()
                .map(|path| ShellChain {
                    path: path.iter().map(|&a| graph.account_id(a).to_string()).collect(),
                })
                .collect(),
            truncated,
        };

        tracing::debug!(
            chains = findings.chains.len(),
            expansions = budget.expansions(),
            truncated = findings.truncated,
            "Shell network search finished"
        );
        findings
    }

    /// Every simple path of valid length whose intermediates are shells,
    /// in discovery order.
    fn collect_candidates(
        &self,
        graph: &TransactionGraph,
        budget: &mut BudgetTracker,
    ) -> (Vec<Vec<usize>>, bool) {
        let n = graph.num_accounts();
        let shell: Vec<bool> = (0..n)
            .map(|a| self.config.is_shell_count(graph.transaction_count(a)))
            .collect();

        let mut candidates = Vec::new();
        let mut on_path = vec![false; n];
        let mut path: Vec<usize> = Vec::with_capacity(self.config.max_length);
        let mut stack: Vec<(usize, usize)> = Vec::with_capacity(self.config.max_length);

        'starts: for start in 0..n {
            if budget.tick().is_err() {
                return (candidates, true);
            }

            path.push(start);
            on_path[start] = true;
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                let neighbors = graph.successors(node);
                let extendable = path.len() < self.config.max_length && (node == start || shell[node]);

                if !extendable || cursor >= neighbors.len() {
                    stack.pop();
                    path.pop();
                    on_path[node] = false;
                    continue;
                }
                frame.1 += 1;

                let next = neighbors[cursor];
                if on_path[next] {
                    continue;
                }
                if budget.tick().is_err() {
                    break 'starts;
                }

                path.push(next);
                on_path[next] = true;
                stack.push((next, 0));

                if path.len() >= self.config.min_length {
                    candidates.push(path.clone());
                }
            }
        }

        let truncated = budget.is_exhausted();
        (candidates, truncated)
    }

    /// Longest-first acceptance. Candidates are simple paths, so a shorter
    /// chain can only be contained in a longer one, never the reverse.
    fn accept(&self, mut candidates: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        candidates.sort_by_key(|path| std::cmp::Reverse(path.len()));

        let mut covered: HashSet<Vec<usize>> = HashSet::new();
        let mut accepted = Vec::new();

        for path in candidates {
            if covered.contains(&path) {
                continue;
            }
            for len in self.config.min_length..=path.len() {
                for window in path.windows(len) {
                    covered.insert(window.to_vec());
                }
            }
            accepted.push(path);
        }
        accepted
    }
}

impl Detector for ShellNetworkDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}

impl BatchDetector<TransactionGraph, ShellFindings> for ShellNetworkDetector {
    fn detect(&self, graph: &TransactionGraph, budget: &mut BudgetTracker) -> Result<ShellFindings> {
        Ok(self.find_chains(graph, budget))
    }
}
