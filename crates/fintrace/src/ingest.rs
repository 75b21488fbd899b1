//! Transaction ingestion.
//!
//! Reads CSV (header row with `transaction_id, sender_id, receiver_id,
//! amount, timestamp`) or a JSON array of transactions. Rows that cannot be
//! used are dropped and counted rather than failing the whole file; a file
//! with no usable row at all is an error.
//!
//! Accepted timestamp formats: RFC 3339, `YYYY-MM-DD H:mm:ss`,
//! `DD-MM-YYYY HH:mm:ss` and `DD-MM-YYYY HH:mm`. Timestamps without an
//! offset are taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use fintrace_core::error::{EngineError, Result};
use fintrace_graph::Transaction;
use std::io::Read;
use std::path::Path;

/// Columns every CSV file must have.
pub const REQUIRED_COLUMNS: [&str; 5] = ["transaction_id", "sender_id", "receiver_id", "amount", "timestamp"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

/// Result of reading one input.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    /// Usable transactions, sorted by timestamp.
    pub transactions: Vec<Transaction>,
    /// Non-empty rows read.
    pub rows: usize,
    /// Rows dropped as unusable.
    pub dropped: usize,
}

/// Parse a timestamp in any accepted format.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Read CSV from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<Ingested> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let mut columns = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        match headers.iter().position(|h| h.trim() == name) {
            Some(idx) => *slot = idx,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(EngineError::validation(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut ingested = Ingested::default();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let field = |col: usize| record.get(columns[col]).unwrap_or("").trim();

        if (0..columns.len()).all(|col| field(col).is_empty()) {
            continue;
        }
        ingested.rows += 1;

        match parse_row(field(0), field(1), field(2), field(3), field(4)) {
            Ok(tx) => ingested.transactions.push(tx),
            Err(problem) => {
                ingested.dropped += 1;
                tracing::debug!(row = line + 2, problem, "Dropping CSV row");
            }
        }
    }

    finish(ingested)
}

/// Read a JSON array of transactions.
pub fn read_json<R: Read>(reader: R) -> Result<Ingested> {
    let transactions: Vec<Transaction> = serde_json::from_reader(reader)?;
    let rows = transactions.len();
    let (kept, defective): (Vec<_>, Vec<_>) = transactions.into_iter().partition(|tx| tx.defect().is_none());

    for tx in &defective {
        tracing::debug!(transaction_id = %tx.id, problem = ?tx.defect(), "Dropping JSON row");
    }

    finish(Ingested {
        transactions: kept,
        rows,
        dropped: defective.len(),
    })
}

/// Read a file; `.json` is parsed as JSON, anything else as CSV.
pub fn read_path(path: impl AsRef<Path>) -> Result<Ingested> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let ingested = if is_json { read_json(file)? } else { read_csv(file)? };
    tracing::info!(
        path = %path.display(),
        transactions = ingested.transactions.len(),
        dropped = ingested.dropped,
        "Transactions loaded"
    );
    Ok(ingested)
}

fn parse_row(
    id: &str,
    sender: &str,
    receiver: &str,
    amount: &str,
    timestamp: &str,
) -> std::result::Result<Transaction, &'static str> {
    let amount: f64 = amount.parse().map_err(|_| "unparseable amount")?;
    let timestamp = parse_timestamp(timestamp).ok_or("unparseable timestamp")?;
    let tx = Transaction::new(id, sender, receiver, amount, timestamp);
    match tx.defect() {
        Some(problem) => Err(problem),
        None => Ok(tx),
    }
}

fn finish(mut ingested: Ingested) -> Result<Ingested> {
    if ingested.transactions.is_empty() {
        return Err(EngineError::validation("no valid transactions found"));
    }
    if ingested.dropped > 0 {
        tracing::warn!(dropped = ingested.dropped, rows = ingested.rows, "Dropped unusable rows");
    }
    ingested.transactions.sort_by_key(|tx| tx.timestamp);
    Ok(ingested)
}

fn csv_error(err: csv::Error) -> EngineError {
    EngineError::DeserializationError(format!("CSV: {}", err))
}
