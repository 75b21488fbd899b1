//! Graph construction.
//!
//! Turns a transaction list into a [`TransactionGraph`]: a read-only
//! directed multigraph over dense account indices plus per-account
//! aggregates. Accounts are numbered in order of first appearance, which
//! keeps every downstream traversal deterministic.

use crate::types::{AccountNode, AggregatedEdge, CsrGraph, Transaction};
use fintrace_core::error::{EngineError, Result};
use std::collections::{HashMap, HashSet};

/// Read-only transaction graph shared by all detectors.
#[derive(Debug, Clone)]
pub struct TransactionGraph {
    transactions: Vec<Transaction>,
    accounts: Vec<AccountNode>,
    index: HashMap<String, usize>,
    outgoing: CsrGraph,
    incoming: CsrGraph,
    /// One entry per distinct (sender, receiver) pair.
    successors: CsrGraph,
    /// Transaction indices touching each account, in input order.
    touching: Vec<Vec<usize>>,
}

impl TransactionGraph {
    /// Build a graph from well-formed transactions.
    pub fn build(transactions: Vec<Transaction>) -> Self {
        let mut accounts: Vec<AccountNode> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut edges: Vec<(usize, usize)> = Vec::with_capacity(transactions.len());
        let mut touching: Vec<Vec<usize>> = Vec::new();

        let mut intern = |id: &str, accounts: &mut Vec<AccountNode>, touching: &mut Vec<Vec<usize>>| {
            *index.entry(id.to_string()).or_insert_with(|| {
                accounts.push(AccountNode::new(id));
                touching.push(Vec::new());
                accounts.len() - 1
            })
        };

        for (tx_idx, tx) in transactions.iter().enumerate() {
            let src = intern(&tx.sender, &mut accounts, &mut touching);
            let dst = intern(&tx.receiver, &mut accounts, &mut touching);
            edges.push((src, dst));

            let sender = &mut accounts[src];
            sender.total_sent += tx.amount;
            sender.transaction_count += 1;
            if src != dst {
                sender.connections.insert(tx.receiver.clone());
            }

            let receiver = &mut accounts[dst];
            receiver.total_received += tx.amount;
            receiver.transaction_count += 1;
            if src != dst {
                receiver.connections.insert(tx.sender.clone());
            }

            touching[src].push(tx_idx);
            if src != dst {
                touching[dst].push(tx_idx);
            }
        }

        let n = accounts.len();
        let reversed: Vec<(usize, usize)> = edges.iter().map(|&(s, d)| (d, s)).collect();
        let mut pairs: HashSet<(usize, usize)> = HashSet::with_capacity(edges.len());
        let distinct: Vec<(usize, usize)> = edges.iter().copied().filter(|&pair| pairs.insert(pair)).collect();

        Self {
            outgoing: CsrGraph::from_edges(n, &edges),
            incoming: CsrGraph::from_edges(n, &reversed),
            successors: CsrGraph::from_edges(n, &distinct),
            transactions,
            accounts,
            index,
            touching,
        }
    }

    /// Graph with no accounts.
    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    /// Number of distinct accounts.
    #[must_use]
    pub fn num_accounts(&self) -> usize {
        self.accounts.len()
    }

    /// Number of transactions (edge occurrences).
    #[must_use]
    pub fn num_transactions(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the graph has no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// All transactions in input order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Account aggregates, indexed by account index.
    pub fn accounts(&self) -> &[AccountNode] {
        &self.accounts
    }

    /// Aggregates for one account index.
    pub fn account(&self, idx: usize) -> &AccountNode {
        &self.accounts[idx]
    }

    /// Account ID for an index.
    pub fn account_id(&self, idx: usize) -> &str {
        &self.accounts[idx].id
    }

    /// Index of an account ID.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Aggregates by account ID.
    pub fn account_by_id(&self, id: &str) -> Option<&AccountNode> {
        self.index_of(id).map(|idx| &self.accounts[idx])
    }

    /// Receivers of each outgoing transfer, one entry per transaction.
    pub fn outgoing(&self, idx: usize) -> &[usize] {
        self.outgoing.neighbors(idx)
    }

    /// Senders of each incoming transfer, one entry per transaction.
    pub fn incoming(&self, idx: usize) -> &[usize] {
        self.incoming.neighbors(idx)
    }

    /// Distinct receivers of an account, in order of first transfer.
    ///
    /// Repeated transfers between the same pair collapse to one entry, so
    /// path searches visit each successor once.
    pub fn successors(&self, idx: usize) -> &[usize] {
        self.successors.neighbors(idx)
    }

    /// Transactions touching an account, in input order.
    pub fn transactions_of(&self, idx: usize) -> impl Iterator<Item = &Transaction> + '_ {
        self.touching[idx].iter().map(move |&t| &self.transactions[t])
    }

    /// Transactions received by an account.
    pub fn received_by(&self, idx: usize) -> impl Iterator<Item = &Transaction> + '_ {
        let id = self.account_id(idx);
        self.transactions_of(idx).filter(move |tx| tx.receiver == id)
    }

    /// Transactions sent by an account.
    pub fn sent_by(&self, idx: usize) -> impl Iterator<Item = &Transaction> + '_ {
        let id = self.account_id(idx);
        self.transactions_of(idx).filter(move |tx| tx.sender == id)
    }

    /// Dataset-wide transaction count for an account index.
    #[must_use]
    pub fn transaction_count(&self, idx: usize) -> u32 {
        self.accounts[idx].transaction_count
    }

    /// Transfers summed per (sender, receiver) pair, in first-appearance order.
    pub fn aggregated_edges(&self) -> Vec<AggregatedEdge> {
        let mut slots: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edges: Vec<AggregatedEdge> = Vec::new();

        for tx in &self.transactions {
            let key = (self.index[&tx.sender], self.index[&tx.receiver]);
            let slot = *slots.entry(key).or_insert_with(|| {
                edges.push(AggregatedEdge {
                    source: tx.sender.clone(),
                    target: tx.receiver.clone(),
                    value: 0.0,
                    count: 0,
                });
                edges.len() - 1
            });
            edges[slot].value += tx.amount;
            edges[slot].count += 1;
        }

        edges
    }
}

/// Builds a [`TransactionGraph`], optionally checking rows first.
///
/// Upstream ingestion is expected to hand over clean rows. In lenient mode
/// (the default) defective rows are dropped with a warning; in strict mode
/// the first defect is an error.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    strict: bool,
}

impl GraphBuilder {
    /// Create a lenient builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder that rejects defective rows.
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Build the graph.
    pub fn build(&self, transactions: Vec<Transaction>) -> Result<TransactionGraph> {
        let total = transactions.len();
        let mut kept = Vec::with_capacity(total);

        for tx in transactions {
            match tx.defect() {
                None => kept.push(tx),
                Some(defect) if self.strict => {
                    return Err(EngineError::validation(format!(
                        "transaction {:?}: {}",
                        tx.id, defect
                    )));
                }
                Some(defect) => {
                    tracing::warn!(transaction_id = %tx.id, defect, "Dropping defective transaction");
                }
            }
        }

        let graph = TransactionGraph::build(kept);
        tracing::debug!(
            transactions = graph.num_transactions(),
            dropped = total - graph.num_transactions(),
            accounts = graph.num_accounts(),
            "Transaction graph built"
        );
        Ok(graph)
    }
}
