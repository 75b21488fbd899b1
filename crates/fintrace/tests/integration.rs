//! Integration tests for FinTrace
//!
//! End-to-end runs from raw transactions (or CSV text) to the final report.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fintrace::core::budget::SearchBudget;
use fintrace::detection::{DetectionEngine, EngineConfig, PatternType, SmurfingConfig};
use fintrace::graph::{AccountRole, GraphBuilder, Transaction};
use std::collections::HashSet;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

fn tx(id: &str, from: &str, to: &str, amount: f64, minutes: i64) -> Transaction {
    Transaction::new(id, from, to, amount, base() + Duration::minutes(minutes))
}

fn fan_in(receiver: &str, senders: usize, spacing_minutes: i64) -> Vec<Transaction> {
    (0..senders)
        .map(|i| {
            tx(
                &format!("{}_IN_{}", receiver, i),
                &format!("{}_S{:02}", receiver, i),
                receiver,
                9_500.0,
                i as i64 * spacing_minutes,
            )
        })
        .collect()
}

fn analyze(transactions: Vec<Transaction>) -> fintrace::detection::EngineOutput {
    DetectionEngine::new().analyze(transactions).unwrap()
}

// ============================================================================
// Cycle Detection
// ============================================================================

#[test]
fn test_five_node_cycle() {
    let txs = vec![
        tx("T1", "A1", "A2", 1000.0, 0),
        tx("T2", "A2", "A3", 990.0, 10),
        tx("T3", "A3", "A4", 980.0, 20),
        tx("T4", "A4", "A5", 970.0, 30),
        tx("T5", "A5", "A1", 960.0, 40),
    ];
    let report = analyze(txs).report;

    let cycles: Vec<_> = report.rings_of(PatternType::Cycle).collect();
    assert_eq!(cycles.len(), 1);
    let ring = cycles[0];
    assert_eq!(ring.ring_id, "RING_001");
    assert_eq!(ring.member_accounts, vec!["A1", "A2", "A3", "A4", "A5"]);
    assert_eq!(ring.risk_score, 95);
    assert_eq!(ring.details, "5-node circular routing");
    assert_eq!(report.fraud_rings[0].ring_id, "RING_001");

    // Every member has two transactions, so the loop also reads as layering
    assert_eq!(report.suspicious_accounts.len(), 5);
    for account in &report.suspicious_accounts {
        assert_eq!(account.reasons[0], "cycle");
        assert!(account.risk_score >= 50);
    }
    assert_eq!(report.summary.patterns_breakdown.cycles, 1);
}

#[test]
fn test_busy_cycle_is_only_a_cycle() {
    let mut txs = Vec::new();
    for lap in 0..2 {
        for (i, (from, to)) in [("A", "B"), ("B", "C"), ("C", "A")].iter().enumerate() {
            txs.push(tx(&format!("T{}_{}", lap, i), from, to, 100.0, lap * 10 + i as i64));
        }
    }
    let report = analyze(txs).report;

    assert_eq!(report.fraud_rings.len(), 1);
    assert_eq!(report.fraud_rings[0].risk_score, 93);
    for account in &report.suspicious_accounts {
        assert_eq!(account.risk_score, 50);
        assert_eq!(account.reasons, vec!["cycle"]);
    }
}

#[test]
fn test_cycle_reported_once_regardless_of_entry_point() {
    // Same 3-cycle, transactions listed starting from a different member
    let txs = vec![
        tx("T1", "C", "A", 10.0, 0),
        tx("T2", "B", "C", 10.0, 1),
        tx("T3", "A", "B", 10.0, 2),
        tx("T4", "A", "B", 10.0, 3),
    ];
    let report = analyze(txs).report;

    let cycles: Vec<_> = report.rings_of(PatternType::Cycle).collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].member_accounts, vec!["A", "B", "C"]);
}

#[test]
fn test_no_rotation_or_mirror_duplicates() {
    // Two opposite 3-cycles over the same accounts plus a 4-cycle
    let txs = vec![
        tx("T1", "A", "B", 10.0, 0),
        tx("T2", "B", "C", 10.0, 1),
        tx("T3", "C", "A", 10.0, 2),
        tx("T4", "A", "C", 10.0, 3),
        tx("T5", "C", "B", 10.0, 4),
        tx("T6", "B", "A", 10.0, 5),
        tx("T7", "C", "D", 10.0, 6),
        tx("T8", "D", "A", 10.0, 7),
    ];
    let report = analyze(txs).report;

    let mut seen = HashSet::new();
    for ring in report.rings_of(PatternType::Cycle) {
        let mut key = ring.member_accounts.clone();
        key.sort();
        assert!(
            seen.insert(key),
            "duplicate cycle over {:?}",
            ring.member_accounts
        );
    }
    assert!(!seen.is_empty());
}

#[test]
fn test_two_cycles_are_not_cycles() {
    let txs = vec![tx("T1", "A", "B", 10.0, 0), tx("T2", "B", "A", 10.0, 1)];
    let output = analyze(txs);

    assert!(output.report.fraud_rings.is_empty());
    assert!(output.report.suspicious_accounts.is_empty());
}

#[test]
fn test_repeated_payments_do_not_hide_cycles() {
    // Regular payroll-style transfers along a chain, 60 per hop
    let mut txs = Vec::new();
    for (hop, (from, to)) in [("P1", "P2"), ("P2", "P3"), ("P3", "P4"), ("P4", "P5")].iter().enumerate() {
        for i in 0..60 {
            txs.push(tx(&format!("P{}_{}", hop, i), from, to, 250.0, (hop * 60 + i) as i64));
        }
    }
    txs.push(tx("T1", "A", "B", 5_000.0, 300));
    txs.push(tx("T2", "B", "C", 4_900.0, 301));
    txs.push(tx("T3", "C", "A", 4_800.0, 302));

    let output = analyze(txs);

    let cycles = output.stats.detector("detection/cycles").unwrap();
    assert!(!cycles.truncated);
    assert!(cycles.expansions < 100);
    let rings: Vec<_> = output.report.rings_of(PatternType::Cycle).collect();
    assert_eq!(rings.len(), 1);
    assert_eq!(rings[0].member_accounts, vec!["A", "B", "C"]);
}

// ============================================================================
// Smurfing Detection
// ============================================================================

#[test]
fn test_fan_in_ten_senders() {
    let report = analyze(fan_in("R", 10, 6)).report;

    assert_eq!(report.summary.patterns_breakdown.fan_in, 1);
    let ring = report.rings_of(PatternType::FanIn).next().unwrap();
    assert_eq!(ring.member_accounts.len(), 11);
    assert_eq!(ring.member_accounts[0], "R");
    assert_eq!(ring.risk_score, 85);

    // Ten distinct counterparties also make the receiver the kingpin
    let receiver = report.suspicious_account("R").unwrap();
    assert_eq!(receiver.risk_score, 95);
    assert_eq!(receiver.reasons, vec!["fan-in", "kingpin"]);
    let sender = report.suspicious_account("R_S00").unwrap();
    assert_eq!(sender.risk_score, 20);
    assert_eq!(sender.reasons, vec!["fan-in"]);
}

#[test]
fn test_fan_in_nine_senders_is_below_threshold() {
    let report = analyze(fan_in("R", 9, 6)).report;

    assert!(report.fraud_rings.is_empty());
    assert_eq!(report.summary.patterns_breakdown.fan_in, 0);
}

#[test]
fn test_fan_in_outside_window() {
    // 10 senders spread over 9 * 9h = 81h: no 72h window holds all of them
    let report = analyze(fan_in("R", 10, 9 * 60)).report;
    assert_eq!(report.summary.patterns_breakdown.fan_in, 0);

    // 10 senders spread over exactly 72h: window is inclusive
    let report = analyze(fan_in("R", 10, 8 * 60)).report;
    assert_eq!(report.summary.patterns_breakdown.fan_in, 1);
}

#[test]
fn test_fan_out() {
    let txs: Vec<Transaction> = (0..12)
        .map(|i| tx(&format!("T{}", i), "HUB", &format!("D{:02}", i), 4_000.0, i * 30))
        .collect();
    let report = analyze(txs).report;

    let ring = report.rings_of(PatternType::FanOut).next().unwrap();
    assert_eq!(ring.member_accounts.len(), 13);
    assert_eq!(ring.member_accounts[0], "HUB");
    assert!(ring.details.starts_with("1 sender"));
    assert_eq!(report.summary.patterns_breakdown.fan_out, 1);
}

#[test]
fn test_custom_smurfing_threshold() {
    let config = EngineConfig::default().with_smurfing(SmurfingConfig {
        min_counterparties: 5,
        ..SmurfingConfig::default()
    });
    let engine = DetectionEngine::with_config(config).unwrap();

    let report = engine.analyze(fan_in("R", 6, 10)).unwrap().report;
    assert_eq!(report.summary.patterns_breakdown.fan_in, 1);
}

// ============================================================================
// Shell Networks
// ============================================================================

fn shell_case() -> Vec<Transaction> {
    let mut txs = vec![
        tx("T1", "X1", "X2", 5000.0, 0),
        tx("T2", "X2", "X3", 4900.0, 60),
        tx("T3", "X3", "X4", 4800.0, 120),
    ];
    // Endpoints are too busy to be shells, but below kingpin reach
    for i in 0..3 {
        txs.push(tx(&format!("P{}", i), &format!("P{}", i), "X1", 100.0, 200 + i));
        txs.push(tx(&format!("Q{}", i), "X4", &format!("Q{}", i), 100.0, 300 + i));
    }
    txs
}

#[test]
fn test_shell_chain() {
    let report = analyze(shell_case()).report;

    let shells: Vec<_> = report.rings_of(PatternType::ShellNetwork).collect();
    assert_eq!(shells.len(), 1);
    assert_eq!(shells[0].member_accounts, vec!["X1", "X2", "X3", "X4"]);
    assert_eq!(shells[0].risk_score, 75);
    assert_eq!(shells[0].details, "4-hop layering chain");

    let flagged: Vec<&str> = report
        .suspicious_accounts
        .iter()
        .map(|a| a.account_id.as_str())
        .collect();
    assert_eq!(flagged, vec!["X2", "X3"]);
    assert!(report.suspicious_accounts.iter().all(|a| a.risk_score == 20));
}

#[test]
fn test_shell_chain_between_very_busy_endpoints() {
    let mut txs = vec![
        tx("T1", "X1", "X2", 5000.0, 0),
        tx("T2", "X2", "X3", 4900.0, 60),
        tx("T3", "X3", "X4", 4800.0, 120),
    ];
    for i in 0..10 {
        txs.push(tx(&format!("P{}", i), &format!("P{}", i), "X1", 100.0, 200 + i * 1440));
        txs.push(tx(&format!("Q{}", i), "X4", &format!("Q{}", i), 100.0, 300 + i * 1440));
    }
    let report = analyze(txs).report;

    let shells: Vec<_> = report.rings_of(PatternType::ShellNetwork).collect();
    assert_eq!(shells.len(), 1);
    assert_eq!(shells[0].member_accounts, vec!["X1", "X2", "X3", "X4"]);
    assert_eq!(shells[0].risk_score, 75);
    assert_eq!(report.suspicious_account("X2").unwrap().reasons, vec!["shell"]);
    assert_eq!(report.suspicious_account("X3").unwrap().reasons, vec!["shell"]);
}

#[test]
fn test_busy_intermediate_breaks_chain() {
    let mut txs = shell_case();
    // X2 now has four transactions and can only start a chain
    txs.push(tx("E1", "X2", "Z", 10.0, 400));
    txs.push(tx("E2", "Z", "X2", 10.0, 401));

    let report = analyze(txs).report;
    let shells: Vec<_> = report.rings_of(PatternType::ShellNetwork).collect();
    assert_eq!(shells.len(), 1);
    assert_eq!(shells[0].member_accounts, vec!["X2", "X3", "X4"]);
    assert!(report.suspicious_account("X2").is_none());
}

// ============================================================================
// Kingpin and Risk Aggregation
// ============================================================================

#[test]
fn test_kingpin_floor_and_clamp() {
    let mut txs = fan_in("R", 10, 5);
    for i in 0..6 {
        txs.push(tx(&format!("K{}", i), "BOSS", &format!("L{}", i), 3_000_000.0, 2000 + i * 1440));
    }
    let report = analyze(txs).report;

    let kingpin = report.kingpin.as_ref().unwrap();
    assert_eq!(kingpin.account_id, "BOSS");

    let boss = report.suspicious_account("BOSS").unwrap();
    assert_eq!(boss.risk_score, 95);
    assert_eq!(boss.reasons, vec!["kingpin"]);
    assert_eq!(report.suspicious_accounts[0].account_id, "BOSS");

    for account in &report.suspicious_accounts {
        assert!(account.risk_score <= 99);
        assert_eq!(account.patterns_detected, account.reasons.len());
    }
}

#[test]
fn test_scores_add_across_patterns_and_clamp() {
    // A sits on two cycles (100 raw) and receives a fan-in (30 more)
    let mut txs = vec![
        tx("C1", "A", "B", 10.0, 0),
        tx("C2", "B", "C", 10.0, 1),
        tx("C3", "C", "A", 10.0, 2),
        tx("C4", "A", "D", 10.0, 3),
        tx("C5", "D", "E", 10.0, 4),
        tx("C6", "E", "A", 10.0, 5),
    ];
    txs.extend(fan_in("A", 10, 5));
    let report = analyze(txs).report;

    let a = report.suspicious_account("A").unwrap();
    assert_eq!(a.risk_score, 99);
    assert_eq!(a.reasons, vec!["cycle", "fan-in", "kingpin"]);
    assert_eq!(a.patterns_detected, 3);

    let membership = report.ring_membership();
    assert!(membership["A"].len() >= 3);
}

#[test]
fn test_rings_sorted_by_risk() {
    let mut txs = shell_case();
    txs.extend(fan_in("R", 10, 5));
    for lap in 0..2 {
        txs.push(tx(&format!("C1_{}", lap), "A", "B", 10.0, lap * 3));
        txs.push(tx(&format!("C2_{}", lap), "B", "C", 10.0, lap * 3 + 1));
        txs.push(tx(&format!("C3_{}", lap), "C", "A", 10.0, lap * 3 + 2));
    }
    let report = analyze(txs).report;

    let ids: Vec<&str> = report.fraud_rings.iter().map(|r| r.ring_id.as_str()).collect();
    assert_eq!(ids, vec!["RING_001", "RING_002", "RING_003"]);
    let risks: Vec<u32> = report.fraud_rings.iter().map(|r| r.risk_score).collect();
    assert_eq!(risks, vec![93, 85, 75]);
}

// ============================================================================
// Engine Behaviour
// ============================================================================

#[test]
fn test_deterministic_across_runs_and_modes() {
    let txs = fintrace::demo::transactions();

    let sequential = DetectionEngine::with_config(EngineConfig::default().with_parallel(false)).unwrap();
    let parallel = DetectionEngine::with_config(EngineConfig::default().with_parallel(true)).unwrap();

    let first = sequential.analyze(txs.clone()).unwrap().report;
    let second = sequential.analyze(txs.clone()).unwrap().report;
    let third = parallel.analyze(txs).unwrap().report;

    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn test_empty_input() {
    let output = analyze(Vec::new());

    assert_eq!(output.report.summary.total_accounts_analyzed, 0);
    assert!(output.report.fraud_rings.is_empty());
    assert!(output.report.kingpin.is_none());
    assert!(!output.stats.any_failed());
}

#[test]
fn test_tight_budget_truncates_enumeration_only() {
    // Dense tournament-ish graph: plenty of cycles to enumerate
    let names: Vec<String> = (0..12).map(|i| format!("N{:02}", i)).collect();
    let mut txs = Vec::new();
    for (i, from) in names.iter().enumerate() {
        for (j, to) in names.iter().enumerate() {
            if i != j {
                txs.push(tx(&format!("T{}_{}", i, j), from, to, 10.0, (i * 12 + j) as i64));
            }
        }
    }

    let config = EngineConfig::default().with_budget(SearchBudget::default().with_max_expansions(50));
    let output = DetectionEngine::with_config(config).unwrap().analyze(txs).unwrap();

    let cycles = output.stats.detector("detection/cycles").unwrap();
    assert!(cycles.truncated);
    assert!(!cycles.failed);
    assert!(cycles.expansions <= 51);

    let smurfing = output.stats.detector("detection/smurfing").unwrap();
    assert!(!smurfing.truncated);
    assert!(output.stats.any_truncated());

    for account in &output.report.suspicious_accounts {
        assert!(account.risk_score <= 99);
    }
}

#[test]
fn test_defective_rows_dropped_by_builder() {
    let txs = vec![
        tx("T1", "A", "B", 10.0, 0),
        tx("T2", "A", "", 10.0, 1),
        tx("T3", "A", "B", -5.0, 2),
    ];

    let output = analyze(txs.clone());
    assert_eq!(output.stats.transactions, 1);
    assert!(GraphBuilder::strict().build(txs).is_err());
}

#[test]
fn test_report_json_shape() {
    let output = analyze(fintrace::demo::transactions());
    let json = serde_json::to_value(&output.report).unwrap();

    assert!(json["suspicious_accounts"].is_array());
    assert!(json["fraud_rings"][0]["ring_id"].is_string());
    assert_eq!(json["fraud_rings"][0]["pattern_type"], "cycle");
    assert!(json["summary"]["patterns_breakdown"]["shell_networks"].is_u64());
    assert_eq!(json["kingpin"]["account_id"], "BOSS");
}

// ============================================================================
// Ingestion and Demo
// ============================================================================

#[test]
fn test_csv_to_report() {
    let mut csv = String::from("transaction_id,sender_id,receiver_id,amount,timestamp\n");
    csv.push_str("TX1,A1,A2,1000,2024-01-15 10:00:00\n");
    csv.push_str("TX2,A2,A3,990,15-01-2024 11:00:00\n");
    csv.push_str("TX3,A3,A1,980,15-01-2024 12:00\n");
    csv.push_str("TX4,A3,A1,oops,2024-01-15 12:00:00\n");

    let ingested = fintrace::ingest::read_csv(csv.as_bytes()).unwrap();
    assert_eq!(ingested.dropped, 1);

    let report = analyze(ingested.transactions).report;
    let cycles: Vec<_> = report.rings_of(PatternType::Cycle).collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].risk_score, 93);
    assert_eq!(cycles[0].member_accounts, vec!["A1", "A2", "A3"]);
}

#[test]
fn test_demo_case_contains_every_pattern() {
    let txs = fintrace::demo::transactions();
    let graph = GraphBuilder::new().build(txs.clone()).unwrap();
    let output = DetectionEngine::new().analyze_graph(&graph);
    let report = &output.report;

    let breakdown = report.summary.patterns_breakdown;
    assert_eq!(breakdown.cycles, 1);
    assert_eq!(breakdown.fan_in, 1);
    assert_eq!(breakdown.fan_out, 1);
    assert_eq!(breakdown.shell_networks, 1);

    let ids: Vec<&str> = report.fraud_rings.iter().map(|r| r.ring_id.as_str()).collect();
    assert_eq!(ids, vec!["RING_001", "RING_002", "RING_003", "RING_004"]);
    assert_eq!(report.fraud_rings[0].member_accounts, fintrace::demo::CYCLE.to_vec());
    assert_eq!(
        report.fraud_rings[3].member_accounts,
        fintrace::demo::SHELL_CHAIN.to_vec()
    );

    assert_eq!(
        report.kingpin.as_ref().map(|k| k.account_id.as_str()),
        Some(fintrace::demo::KINGPIN)
    );
    assert_eq!(report.suspicious_accounts[0].account_id, fintrace::demo::KINGPIN);

    let view = output.graph_view(&graph);
    assert_eq!(view.nodes.len(), graph.num_accounts());
    let boss = view.node(fintrace::demo::KINGPIN).unwrap();
    assert!(boss.is_kingpin);
    assert_eq!(boss.role, AccountRole::Kingpin);
    assert!(boss.risk >= 95);
    let collector = view.node(fintrace::demo::COLLECTOR).unwrap();
    assert!(collector.suspicious);
    assert_eq!(collector.rings, vec!["RING_002"]);
}
