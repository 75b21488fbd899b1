//! Kingpin scoring.
//!
//! Combines money moved and degree centrality to name the single account
//! most likely to control the flows.

use crate::config::KingpinConfig;
use crate::types::{KingpinCandidate, KingpinFindings};
use fintrace_core::budget::BudgetTracker;
use fintrace_core::detector::DetectorMetadata;
use fintrace_core::error::Result;
use fintrace_core::traits::{BatchDetector, Detector};
use fintrace_graph::{AccountNode, TransactionGraph};
use std::cmp::Ordering;

/// Kingpin scoring kernel.
#[derive(Debug, Clone)]
pub struct KingpinScorer {
    metadata: DetectorMetadata,
    config: KingpinConfig,
}

impl Default for KingpinScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl KingpinScorer {
    /// Create a scorer with default weights.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(KingpinConfig::default())
    }

    /// Create a scorer with custom weights.
    #[must_use]
    pub fn with_config(config: KingpinConfig) -> Self {
        Self {
            metadata: DetectorMetadata::scan("detection/kingpin")
                .with_description("Flow and degree centrality ranking"),
            config,
        }
    }

    /// Scorer configuration.
    pub fn config(&self) -> &KingpinConfig {
        &self.config
    }

    /// Score one account against a graph of `total_accounts`.
    pub fn score(&self, account: &AccountNode, total_accounts: usize) -> KingpinCandidate {
        let connections = account.connection_count();
        let degree_centrality = if total_accounts > 1 {
            connections as f64 / (total_accounts - 1) as f64
        } else {
            0.0
        };
        let total_flow = account.total_flow();
        let score = self.config.flow_weight * (total_flow / self.config.flow_normalizer)
            + self.config.centrality_weight * (degree_centrality * 100.0);

        KingpinCandidate {
            account_id: account.id.clone(),
            total_flow,
            total_sent: account.total_sent,
            total_received: account.total_received,
            connections,
            degree_centrality,
            score,
        }
    }

    /// Select the kingpin. Equal scores go to the lowest account ID.
    pub fn select(&self, graph: &TransactionGraph) -> KingpinFindings {
        let total = graph.num_accounts();
        let mut eligible = 0;
        let mut best: Option<KingpinCandidate> = None;

        for account in graph.accounts() {
            if account.connection_count() < self.config.min_connections {
                continue;
            }
            eligible += 1;

            let candidate = self.score(account, total);
            let better = match &best {
                None => true,
                Some(current) => match candidate.score.total_cmp(&current.score) {
                    Ordering::Greater => true,
                    Ordering::Equal => candidate.account_id < current.account_id,
                    Ordering::Less => false,
                },
            };
            if better {
                best = Some(candidate);
            }
        }

        if let Some(kingpin) = &best {
            tracing::debug!(
                account = %kingpin.account_id,
                score = kingpin.score,
                connections = kingpin.connections,
                eligible,
                "Kingpin selected"
            );
        }

        KingpinFindings {
            kingpin: best,
            eligible,
        }
    }
}

impl Detector for KingpinScorer {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}

impl BatchDetector<TransactionGraph, KingpinFindings> for KingpinScorer {
    fn detect(&self, graph: &TransactionGraph, _budget: &mut BudgetTracker) -> Result<KingpinFindings> {
        Ok(self.select(graph))
    }
}
