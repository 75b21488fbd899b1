//! Transaction, account and adjacency types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Transaction Types
// ============================================================================

/// A single money transfer between two accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID.
    #[serde(rename = "transaction_id")]
    pub id: String,
    /// Sending account.
    #[serde(rename = "sender_id")]
    pub sender: String,
    /// Receiving account.
    #[serde(rename = "receiver_id")]
    pub receiver: String,
    /// Transferred amount, strictly positive.
    pub amount: f64,
    /// When the transfer happened.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction.
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
        }
    }

    /// Returns a description of the first problem with this row, if any.
    pub fn defect(&self) -> Option<&'static str> {
        if self.id.trim().is_empty() {
            Some("missing transaction_id")
        } else if self.sender.trim().is_empty() {
            Some("missing sender_id")
        } else if self.receiver.trim().is_empty() {
            Some("missing receiver_id")
        } else if !self.amount.is_finite() || self.amount <= 0.0 {
            Some("amount must be a positive number")
        } else {
            None
        }
    }

    /// Whether sender and receiver are the same account.
    pub fn is_self_transfer(&self) -> bool {
        self.sender == self.receiver
    }
}

// ============================================================================
// Account Aggregates
// ============================================================================

/// Per-account aggregates over the whole transaction set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountNode {
    /// Account ID.
    pub id: String,
    /// Sum of amounts sent.
    pub total_sent: f64,
    /// Sum of amounts received.
    pub total_received: f64,
    /// Transactions touching this account, as sender or receiver.
    pub transaction_count: u32,
    /// Distinct counterparties in either direction.
    pub connections: BTreeSet<String>,
}

impl AccountNode {
    /// Create an empty node.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Total money moved through the account.
    #[must_use]
    pub fn total_flow(&self) -> f64 {
        self.total_sent + self.total_received
    }

    /// Number of distinct counterparties.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Sent / received ratio, with one added to the denominator.
    #[must_use]
    pub fn flow_ratio(&self) -> f64 {
        self.total_sent / (self.total_received + 1.0)
    }
}

// ============================================================================
// Adjacency
// ============================================================================

/// Adjacency in Compressed Sparse Row (CSR) format.
///
/// Parallel edges are kept: one column entry per transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrGraph {
    /// Number of nodes.
    pub num_nodes: usize,
    /// Number of edges.
    pub num_edges: usize,
    /// Row offsets (length: num_nodes + 1).
    pub row_offsets: Vec<usize>,
    /// Column indices (length: num_edges).
    pub col_indices: Vec<usize>,
}

impl CsrGraph {
    /// Create a graph from an edge list.
    ///
    /// Within a row, neighbours keep the order in which their edges appear.
    #[must_use]
    pub fn from_edges(num_nodes: usize, edges: &[(usize, usize)]) -> Self {
        let mut row_counts = vec![0usize; num_nodes];
        for (src, _) in edges {
            row_counts[*src] += 1;
        }

        let mut row_offsets = vec![0usize; num_nodes + 1];
        for i in 0..num_nodes {
            row_offsets[i + 1] = row_offsets[i] + row_counts[i];
        }

        let mut col_indices = vec![0usize; edges.len()];
        let mut current_pos = row_offsets.clone();

        for (src, dst) in edges {
            col_indices[current_pos[*src]] = *dst;
            current_pos[*src] += 1;
        }

        Self {
            num_nodes,
            num_edges: edges.len(),
            row_offsets,
            col_indices,
        }
    }

    /// Get the out-degree of a node (parallel edges counted).
    #[must_use]
    pub fn out_degree(&self, node: usize) -> usize {
        if node >= self.num_nodes {
            return 0;
        }
        self.row_offsets[node + 1] - self.row_offsets[node]
    }

    /// Get the neighbors of a node.
    #[must_use]
    pub fn neighbors(&self, node: usize) -> &[usize] {
        if node >= self.num_nodes {
            return &[];
        }
        &self.col_indices[self.row_offsets[node]..self.row_offsets[node + 1]]
    }
}

/// All transfers from one account to another, summed. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEdge {
    /// Sending account.
    pub source: String,
    /// Receiving account.
    pub target: String,
    /// Summed amount.
    pub value: f64,
    /// Number of transfers.
    pub count: u32,
}
