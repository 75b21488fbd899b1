//! Heuristic display risk.
//!
//! A per-account score computed from activity alone, used to colour and size
//! accounts in graph views. Detector findings override it: a flagged account
//! is lifted to at least 85 and the kingpin to at least 95.

use crate::types::AccountNode;

/// Highest score any account can be shown with.
pub const MAX_DISPLAY_RISK: u32 = 99;

/// Floor applied to accounts flagged by any detector, before the flag bonus.
pub const FLAGGED_FLOOR: f64 = 70.0;

/// Bonus added to flagged accounts after the floor.
pub const FLAGGED_BONUS: f64 = 15.0;

/// Floor applied to the kingpin.
pub const KINGPIN_FLOOR: f64 = 95.0;

/// Detector verdicts that override activity-based scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskFlags {
    /// Flagged by at least one detector or a member of a ring.
    pub suspicious: bool,
    /// Selected as kingpin.
    pub kingpin: bool,
}

impl RiskFlags {
    /// Flags for an account no detector reported.
    pub const CLEAN: RiskFlags = RiskFlags {
        suspicious: false,
        kingpin: false,
    };

    /// Flags for a suspicious account.
    pub const SUSPICIOUS: RiskFlags = RiskFlags {
        suspicious: true,
        kingpin: false,
    };
}

/// Activity-only part of the score.
pub fn activity_score(node: &AccountNode) -> f64 {
    let mut score = 0.0;

    if node.transaction_count > 50 {
        score += 30.0;
    } else if node.transaction_count > 20 {
        score += 15.0;
    }

    let flow = node.total_flow();
    if flow > 500_000.0 {
        score += 40.0;
    } else if flow > 100_000.0 {
        score += 20.0;
    }

    let ratio = node.flow_ratio();
    if ratio > 5.0 || ratio < 0.2 {
        score += 20.0;
    }

    score
}

/// Display risk in `[0, 99]`.
pub fn heuristic_risk(node: &AccountNode, flags: RiskFlags) -> u32 {
    let mut score = activity_score(node);

    if flags.suspicious {
        score = score.max(FLAGGED_FLOOR) + FLAGGED_BONUS;
    }
    if flags.kingpin {
        score = score.max(KINGPIN_FLOOR);
    }

    (score.round() as u32).min(MAX_DISPLAY_RISK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(count: u32, sent: f64, received: f64) -> AccountNode {
        AccountNode {
            id: "A".to_string(),
            total_sent: sent,
            total_received: received,
            transaction_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn test_quiet_balanced_account() {
        assert_eq!(heuristic_risk(&node(3, 1_000.0, 1_000.0), RiskFlags::CLEAN), 0);
    }

    #[test]
    fn test_activity_tiers() {
        // >20 txs, >100k flow, balanced
        assert_eq!(heuristic_risk(&node(21, 60_000.0, 60_000.0), RiskFlags::CLEAN), 35);
        // >50 txs, >500k flow, sends only
        assert_eq!(heuristic_risk(&node(51, 600_000.0, 0.0), RiskFlags::CLEAN), 90);
    }

    #[test]
    fn test_receive_only_account_is_imbalanced() {
        // ratio = 0 / (r + 1) < 0.2
        assert_eq!(heuristic_risk(&node(2, 0.0, 500.0), RiskFlags::CLEAN), 20);
    }

    #[test]
    fn test_suspicious_floor_and_bonus() {
        assert_eq!(heuristic_risk(&node(3, 1_000.0, 1_000.0), RiskFlags::SUSPICIOUS), 85);
        // 90 + 15 clamps to 99
        assert_eq!(heuristic_risk(&node(51, 600_000.0, 0.0), RiskFlags::SUSPICIOUS), 99);
    }

    #[test]
    fn test_kingpin_floor() {
        let flags = RiskFlags {
            suspicious: false,
            kingpin: true,
        };
        assert_eq!(heuristic_risk(&node(3, 1_000.0, 1_000.0), flags), 95);

        let flags = RiskFlags {
            suspicious: true,
            kingpin: true,
        };
        assert_eq!(heuristic_risk(&node(3, 1_000.0, 1_000.0), flags), 95);
    }
}
