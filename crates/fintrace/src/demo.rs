//! Built-in synthetic case.
//!
//! Small enough to read by hand, with exactly one instance of each pattern:
//!
//! | pattern | accounts |
//! |---|---|
//! | cycle | `CYC_1` → `CYC_2` → ... → `CYC_5` → `CYC_1`, two laps |
//! | fan-in | `SRC_01`..`SRC_12` → `COLLECTOR` within 12 hours |
//! | fan-out | `DISTRIBUTOR` → `DST_01`..`DST_11` within 24 hours |
//! | shell network | `LAYER_IN` → `SHELL_A` → `SHELL_B` → `LAYER_OUT` |
//! | kingpin | `BOSS`, funding the collector, distributor and lieutenants |
//!
//! `BOSS` pays out one transfer per day so its own outflow never looks like
//! a fan-out.

use chrono::{DateTime, Duration, Utc};
use fintrace_graph::Transaction;

/// Account expected to be selected as kingpin.
pub const KINGPIN: &str = "BOSS";

/// Cycle members in routing order.
pub const CYCLE: [&str; 5] = ["CYC_1", "CYC_2", "CYC_3", "CYC_4", "CYC_5"];

/// Fan-in receiver.
pub const COLLECTOR: &str = "COLLECTOR";

/// Fan-out sender.
pub const DISTRIBUTOR: &str = "DISTRIBUTOR";

/// Shell chain in path order.
pub const SHELL_CHAIN: [&str; 4] = ["LAYER_IN", "SHELL_A", "SHELL_B", "LAYER_OUT"];

const FAN_IN_SENDERS: usize = 12;
const FAN_OUT_RECEIVERS: usize = 11;
const LIEUTENANTS: usize = 8;

// 2024-03-01 09:00:00 UTC
const START_SECS: i64 = 1_709_283_600;

/// Transactions of the synthetic case, sorted by timestamp.
pub fn transactions() -> Vec<Transaction> {
    let start = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(START_SECS);
    let mut txs = Vec::new();
    let mut push = |sender: &str, receiver: &str, amount: f64, at: DateTime<Utc>| {
        let id = format!("DEMO_{:04}", txs.len() + 1);
        txs.push(Transaction::new(id, sender, receiver, amount, at));
    };

    // Circular routing, skimming a little on every hop.
    for lap in 0..2 {
        for (hop, from) in CYCLE.iter().enumerate() {
            let to = CYCLE[(hop + 1) % CYCLE.len()];
            let step = (lap * CYCLE.len() + hop) as i64;
            push(from, to, 48_000.0 - 450.0 * step as f64, start + Duration::hours(step));
        }
    }

    // Structuring into the collector, just under reporting thresholds.
    for i in 0..FAN_IN_SENDERS {
        let sender = format!("SRC_{:02}", i + 1);
        push(&sender, COLLECTOR, 9_400.0 + 35.0 * i as f64, start + Duration::hours(24 + i as i64));
    }
    push(COLLECTOR, KINGPIN, 110_000.0, start + Duration::hours(48));

    // Dispersal from the distributor.
    for i in 0..FAN_OUT_RECEIVERS {
        let receiver = format!("DST_{:02}", i + 1);
        push(
            DISTRIBUTOR,
            &receiver,
            8_900.0 - 60.0 * i as f64,
            start + Duration::hours(72) + Duration::minutes(120 * i as i64),
        );
    }

    // Layering through two low-activity passthroughs.
    for (hop, pair) in SHELL_CHAIN.windows(2).enumerate() {
        push(
            pair[0],
            pair[1],
            75_000.0 - 1_500.0 * hop as f64,
            start + Duration::hours(30 + 6 * hop as i64),
        );
    }

    // The controller: one large payout per day.
    let mut payees: Vec<String> = vec![DISTRIBUTOR.to_string(), CYCLE[0].to_string()];
    payees.extend((0..LIEUTENANTS).map(|i| format!("LT_{}", i + 1)));
    for (day, payee) in payees.iter().enumerate() {
        let amount = if day < 2 { 120_000.0 } else { 1_500_000.0 };
        push(KINGPIN, payee, amount, start + Duration::days(day as i64) + Duration::hours(1));
    }

    txs.sort_by_key(|tx| tx.timestamp);
    txs
}
