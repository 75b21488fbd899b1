//! Graph view for visualization consumers.
//!
//! Combines account aggregates, detector verdicts and ring memberships into a
//! node/link structure. Nothing here feeds back into detection.

use crate::builder::TransactionGraph;
use crate::risk::{heuristic_risk, RiskFlags};
use crate::types::AggregatedEdge;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Role an account plays in the detected structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountRole {
    /// Not part of any ring.
    Normal,
    /// Member of at least one ring.
    Mule,
    /// The selected kingpin.
    Kingpin,
}

/// Detector verdicts the view is annotated with.
#[derive(Debug, Clone, Default)]
pub struct ViewAnnotations {
    /// Accounts flagged by any detector.
    pub suspicious: HashSet<String>,
    /// Kingpin account, if one was selected.
    pub kingpin: Option<String>,
    /// Ring IDs per account, in ring order.
    pub ring_membership: BTreeMap<String, Vec<String>>,
}

/// One account in the view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewNode {
    /// Account ID.
    pub id: String,
    /// Sum sent.
    pub total_sent: f64,
    /// Sum received.
    pub total_received: f64,
    /// Transactions touching the account.
    pub transaction_count: u32,
    /// Total flow.
    pub amount: f64,
    /// Heuristic display risk in `[0, 99]`.
    pub risk: u32,
    /// Flagged or ring member.
    pub suspicious: bool,
    /// Selected kingpin.
    pub is_kingpin: bool,
    /// Every ring this account belongs to.
    pub rings: Vec<String>,
    /// Display role.
    pub role: AccountRole,
}

/// Node/link view of an analyzed graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphView {
    /// Accounts in first-appearance order.
    pub nodes: Vec<ViewNode>,
    /// Aggregated transfers.
    pub links: Vec<AggregatedEdge>,
}

impl GraphView {
    /// Build the view.
    pub fn build(graph: &TransactionGraph, annotations: &ViewAnnotations) -> Self {
        let nodes = graph
            .accounts()
            .iter()
            .map(|account| {
                let rings = annotations
                    .ring_membership
                    .get(&account.id)
                    .cloned()
                    .unwrap_or_default();
                let is_kingpin = annotations.kingpin.as_deref() == Some(account.id.as_str());
                let suspicious = is_kingpin
                    || !rings.is_empty()
                    || annotations.suspicious.contains(&account.id);

                let role = if is_kingpin {
                    AccountRole::Kingpin
                } else if !rings.is_empty() {
                    AccountRole::Mule
                } else {
                    AccountRole::Normal
                };

                ViewNode {
                    id: account.id.clone(),
                    total_sent: account.total_sent,
                    total_received: account.total_received,
                    transaction_count: account.transaction_count,
                    amount: account.total_flow(),
                    risk: heuristic_risk(
                        account,
                        RiskFlags {
                            suspicious,
                            kingpin: is_kingpin,
                        },
                    ),
                    suspicious,
                    is_kingpin,
                    rings,
                    role,
                }
            })
            .collect();

        Self {
            nodes,
            links: graph.aggregated_edges(),
        }
    }

    /// Find a node by account ID.
    pub fn node(&self, id: &str) -> Option<&ViewNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
