//! Smurfing (structuring) detection.
//!
//! Fan-in: many distinct senders paying one receiver inside a time window.
//! Fan-out: one sender paying many distinct receivers inside a time window.
//! Only the first qualifying window per anchor account is reported.

use crate::config::SmurfingConfig;
use crate::types::{PatternType, SmurfingFindings, SmurfingPattern};
use fintrace_core::budget::BudgetTracker;
use fintrace_core::detector::DetectorMetadata;
use fintrace_core::error::Result;
use fintrace_core::traits::{BatchDetector, Detector};
use fintrace_graph::{Transaction, TransactionGraph};
use std::collections::{HashMap, HashSet};

/// Smurfing detection kernel.
///
/// Both directions run in one pass over the grouped transactions; windows are
/// `[t, t + window]` with both ends inclusive, anchored at each distinct
/// transaction time in ascending order.
#[derive(Debug, Clone)]
pub struct SmurfingDetector {
    metadata: DetectorMetadata,
    config: SmurfingConfig,
}

impl Default for SmurfingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmurfingDetector {
    /// Create a detector with the default 72h / 10 counterparties rule.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SmurfingConfig::default())
    }

    /// Create a detector with a custom window and threshold.
    #[must_use]
    pub fn with_config(config: SmurfingConfig) -> Self {
        Self {
            metadata: DetectorMetadata::scan("detection/smurfing")
                .with_description("Fan-in / fan-out structuring inside a sliding window"),
            config,
        }
    }

    /// Detector configuration.
    pub fn config(&self) -> &SmurfingConfig {
        &self.config
    }

    /// Run both passes.
    pub fn find_patterns(&self, graph: &TransactionGraph) -> SmurfingFindings {
        let findings = SmurfingFindings {
            fan_in: self.scan(graph, PatternType::FanIn),
            fan_out: self.scan(graph, PatternType::FanOut),
        };

        tracing::debug!(
            fan_in = findings.fan_in.len(),
            fan_out = findings.fan_out.len(),
            "Smurfing scan finished"
        );
        findings
    }

    /// One direction. Anchors are visited in the order they first appear in
    /// that role.
    fn scan(&self, graph: &TransactionGraph, direction: PatternType) -> Vec<SmurfingPattern> {
        let mut groups: HashMap<&str, Vec<&Transaction>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for tx in graph.transactions() {
            let anchor = anchor_of(tx, direction);
            let group = groups.entry(anchor).or_default();
            if group.is_empty() {
                order.push(anchor);
            }
            group.push(tx);
        }

        let mut patterns = Vec::new();
        for anchor in order {
            let Some(txs) = groups.get_mut(anchor) else {
                continue;
            };
            if txs.len() < self.config.min_counterparties {
                continue;
            }
            txs.sort_by_key(|tx| tx.timestamp);

            if let Some(pattern) = self.first_window(anchor, txs, direction) {
                patterns.push(pattern);
            }
        }
        patterns
    }

    /// First window holding enough distinct counterparties, if any.
    ///
    /// `txs` must be sorted by timestamp.
    fn first_window(
        &self,
        anchor: &str,
        txs: &[&Transaction],
        direction: PatternType,
    ) -> Option<SmurfingPattern> {
        let window = self.config.window();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut lo = 0;
        let mut hi = 0;
        let mut start_idx = 0;

        while start_idx < txs.len() {
            let start = txs[start_idx].timestamp;
            let end = start + window;

            while lo < start_idx {
                let party = counterparty_of(txs[lo], direction);
                if party != anchor {
                    if let Some(count) = counts.get_mut(party) {
                        *count -= 1;
                        if *count == 0 {
                            counts.remove(party);
                        }
                    }
                }
                lo += 1;
            }

            while hi < txs.len() && txs[hi].timestamp <= end {
                let party = counterparty_of(txs[hi], direction);
                if party != anchor {
                    *counts.entry(party).or_insert(0) += 1;
                }
                hi += 1;
            }

            if counts.len() >= self.config.min_counterparties {
                let in_window = &txs[lo..hi];
                let mut seen = HashSet::new();
                let counterparties = in_window
                    .iter()
                    .map(|tx| counterparty_of(tx, direction))
                    .filter(|party| *party != anchor && seen.insert(*party))
                    .map(str::to_string)
                    .collect();

                return Some(SmurfingPattern {
                    pattern_type: direction,
                    anchor: anchor.to_string(),
                    counterparties,
                    window_start: start,
                    window_end: end,
                    transaction_count: in_window.len(),
                });
            }

            // Windows starting at equal timestamps are identical
            start_idx += 1;
            while start_idx < txs.len() && txs[start_idx].timestamp == start {
                start_idx += 1;
            }
        }

        None
    }
}

fn anchor_of(tx: &Transaction, direction: PatternType) -> &str {
    match direction {
        PatternType::FanOut => &tx.sender,
        _ => &tx.receiver,
    }
}

fn counterparty_of<'t>(tx: &'t Transaction, direction: PatternType) -> &'t str {
    match direction {
        PatternType::FanOut => &tx.receiver,
        _ => &tx.sender,
    }
}

impl Detector for SmurfingDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}

impl BatchDetector<TransactionGraph, SmurfingFindings> for SmurfingDetector {
    fn detect(&self, graph: &TransactionGraph, _budget: &mut BudgetTracker) -> Result<SmurfingFindings> {
        Ok(self.find_patterns(graph))
    }
}
