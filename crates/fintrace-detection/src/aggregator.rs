//! Risk aggregation.
//!
//! Numbers rings, accumulates per-account scores and reasons, and assembles
//! the final [`DetectionReport`]. Findings are merged in a fixed order
//! (cycles, fan-in, fan-out, shell) so ring IDs do not depend on which
//! detector finished first.

use crate::types::{
    CycleFindings, DetectionReport, FraudRing, KingpinFindings, PatternType, PatternsBreakdown,
    ShellFindings, SmurfingFindings, SmurfingPattern, SuspiciousAccountRecord, Summary, SHELL_RISK,
    SMURFING_RISK,
};
use fintrace_graph::risk::{KINGPIN_FLOOR, MAX_DISPLAY_RISK};
use std::collections::HashMap;

/// Added to every cycle member.
pub const CYCLE_MEMBER_SCORE: u32 = 50;
/// Added to a fan-in receiver or fan-out sender.
pub const SMURFING_ANCHOR_SCORE: u32 = 30;
/// Added to each smurfing counterparty.
pub const SMURFING_COUNTERPARTY_SCORE: u32 = 20;
/// Added to each shell intermediate.
pub const SHELL_INTERMEDIATE_SCORE: u32 = 20;
/// Reason recorded on the kingpin.
pub const KINGPIN_REASON: &str = "kingpin";

/// Raw contributions for one account.
#[derive(Debug, Default)]
struct Accumulated {
    score: u32,
    reasons: Vec<String>,
}

/// Per-account accumulator keeping first-flag order.
#[derive(Debug, Default)]
struct SuspicionLedger {
    order: Vec<String>,
    entries: HashMap<String, Accumulated>,
}

impl SuspicionLedger {
    fn add(&mut self, account: &str, reason: &str, score: u32) {
        if !self.entries.contains_key(account) {
            self.order.push(account.to_string());
        }
        let entry = self.entries.entry(account.to_string()).or_default();
        if !entry.reasons.iter().any(|r| r == reason) {
            entry.reasons.push(reason.to_string());
        }
        entry.score = entry.score.saturating_add(score);
    }

    fn into_records(mut self, kingpin: Option<&str>) -> Vec<SuspiciousAccountRecord> {
        self.order
            .into_iter()
            .filter_map(|account_id| {
                let entry = self.entries.remove(&account_id)?;
                let mut score = entry.score;
                if kingpin == Some(account_id.as_str()) {
                    score = score.max(KINGPIN_FLOOR as u32);
                }
                Some(SuspiciousAccountRecord {
                    patterns_detected: entry.reasons.len(),
                    risk_score: score.min(MAX_DISPLAY_RISK),
                    reasons: entry.reasons,
                    account_id,
                })
            })
            .collect()
    }
}

/// Merges detector findings into a report.
#[derive(Debug, Default)]
pub struct RiskAggregator {
    rings: Vec<FraudRing>,
    ledger: SuspicionLedger,
    breakdown: PatternsBreakdown,
}

impl RiskAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_ring(&mut self, pattern_type: PatternType, member_accounts: Vec<String>, risk_score: u32, details: String) {
        let ring_id = format!("RING_{:03}", self.rings.len() + 1);
        self.rings.push(FraudRing {
            ring_id,
            pattern_type,
            member_accounts,
            risk_score,
            details,
        });
    }

    /// Add cycle rings; every member is flagged.
    pub fn add_cycles(&mut self, findings: &CycleFindings) {
        for cycle in &findings.cycles {
            self.push_ring(PatternType::Cycle, cycle.members.clone(), cycle.risk_score(), cycle.details());
            for member in &cycle.members {
                self.ledger.add(member, PatternType::Cycle.reason(), CYCLE_MEMBER_SCORE);
            }
        }
        self.breakdown.cycles += findings.cycles.len();
    }

    fn add_smurfing_pattern(&mut self, pattern: &SmurfingPattern) {
        let reason = pattern.pattern_type.reason();
        self.push_ring(pattern.pattern_type, pattern.members(), SMURFING_RISK, pattern.details());
        self.ledger.add(&pattern.anchor, reason, SMURFING_ANCHOR_SCORE);
        for party in &pattern.counterparties {
            self.ledger.add(party, reason, SMURFING_COUNTERPARTY_SCORE);
        }
    }

    /// Add fan-in then fan-out rings.
    pub fn add_smurfing(&mut self, findings: &SmurfingFindings) {
        for pattern in &findings.fan_in {
            self.add_smurfing_pattern(pattern);
        }
        for pattern in &findings.fan_out {
            self.add_smurfing_pattern(pattern);
        }
        self.breakdown.fan_in += findings.fan_in.len();
        self.breakdown.fan_out += findings.fan_out.len();
    }

    /// Add shell rings; only intermediates are flagged.
    pub fn add_shell_networks(&mut self, findings: &ShellFindings) {
        for chain in &findings.chains {
            self.push_ring(PatternType::ShellNetwork, chain.path.clone(), SHELL_RISK, chain.details());
            for account in chain.intermediates() {
                self.ledger
                    .add(account, PatternType::ShellNetwork.reason(), SHELL_INTERMEDIATE_SCORE);
            }
        }
        self.breakdown.shell_networks += findings.chains.len();
    }

    /// Build the report for a graph of `total_accounts`.
    pub fn finish(mut self, total_accounts: usize, kingpin: &KingpinFindings) -> DetectionReport {
        let kingpin_id = kingpin.kingpin.as_ref().map(|k| k.account_id.clone());
        if let Some(id) = &kingpin_id {
            self.ledger.add(id, KINGPIN_REASON, 0);
        }

        let mut suspicious_accounts = self.ledger.into_records(kingpin_id.as_deref());
        suspicious_accounts.sort_by(|a, b| {
            b.risk_score
                .cmp(&a.risk_score)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });

        let mut fraud_rings = self.rings;
        fraud_rings.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

        let summary = Summary {
            total_accounts_analyzed: total_accounts,
            suspicious_accounts_flagged: suspicious_accounts.len(),
            fraud_rings_detected: fraud_rings.len(),
            patterns_breakdown: self.breakdown,
        };

        DetectionReport {
            suspicious_accounts,
            fraud_rings,
            summary,
            kingpin: kingpin.kingpin.clone(),
        }
    }

    /// Merge all findings in the fixed order.
    pub fn aggregate(
        total_accounts: usize,
        cycles: &CycleFindings,
        smurfing: &SmurfingFindings,
        shell: &ShellFindings,
        kingpin: &KingpinFindings,
    ) -> DetectionReport {
        let mut aggregator = Self::new();
        aggregator.add_cycles(cycles);
        aggregator.add_smurfing(smurfing);
        aggregator.add_shell_networks(shell);
        aggregator.finish(total_accounts, kingpin)
    }
}
