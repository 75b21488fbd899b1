//! FinTrace CLI tool.
//!
//! Runs fraud ring detection over a transaction file and prints the report.

use anyhow::Context;
use clap::{Parser, Subcommand};
use fintrace::core::logging::{LogConfig, LogFormat, LogLevel};
use fintrace::detection::{DetectionEngine, DetectionReport, EngineConfig, EngineOutput, RunStats};
use fintrace::graph::{GraphBuilder, TransactionGraph};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fintrace")]
#[command(version, about = "Fraud ring detection over transaction graphs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, env = "FINTRACE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a CSV or JSON transaction file
    Analyze {
        /// Input file (`.json` is read as JSON, anything else as CSV)
        input: PathBuf,

        /// Engine configuration (TOML); defaults to FINTRACE_* environment
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the annotated graph view (JSON) to this file
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Include run statistics in the report
        #[arg(long)]
        stats: bool,

        /// Pretty-print JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// Analyze the built-in synthetic case
    Demo {
        /// Print the full JSON report instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Print an engine configuration as TOML
    Config {
        /// Preset: default, development or production
        #[arg(short, long, default_value = "default")]
        preset: String,

        /// Apply FINTRACE_* environment overrides
        #[arg(long)]
        from_env: bool,
    },

    /// List the detectors the engine runs
    Detectors,
}

#[derive(Serialize)]
struct ReportWithStats<'a> {
    #[serde(flatten)]
    report: &'a DetectionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a RunStats>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Compact };
    LogConfig::default().with_level(level).with_format(format).init()?;

    match cli.command {
        Commands::Analyze {
            input,
            config,
            output,
            graph,
            stats,
            pretty,
        } => {
            cmd_analyze(&input, config.as_deref(), output.as_deref(), graph.as_deref(), stats, pretty)?;
        }

        Commands::Demo { json } => {
            cmd_demo(json)?;
        }

        Commands::Config { preset, from_env } => {
            cmd_config(&preset, from_env)?;
        }

        Commands::Detectors => {
            cmd_detectors();
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::from_env()?,
    };
    Ok(config)
}

fn cmd_analyze(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    graph_out: Option<&Path>,
    with_stats: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let engine = DetectionEngine::with_config(load_config(config)?)?;

    let ingested = fintrace::ingest::read_path(input).with_context(|| format!("reading {}", input.display()))?;
    let graph = GraphBuilder::new().build(ingested.transactions)?;
    let result = engine.analyze_graph(&graph);
    if result.stats.any_failed() || result.stats.any_truncated() {
        tracing::warn!(run_id = %result.stats.run_id, "Report is incomplete, see detector warnings above");
    }

    let body = ReportWithStats {
        report: &result.report,
        stats: with_stats.then_some(&result.stats),
    };
    let json = to_json(&body, pretty)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }

    if let Some(path) = graph_out {
        write_graph_view(&result, &graph, path, pretty)?;
    }

    Ok(())
}

fn cmd_demo(json: bool) -> anyhow::Result<()> {
    let graph = GraphBuilder::new().build(fintrace::demo::transactions())?;
    let result = DetectionEngine::new().analyze_graph(&graph);

    if json {
        println!("{}", to_json(&result.report, true)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn cmd_config(preset: &str, from_env: bool) -> anyhow::Result<()> {
    let config = if from_env {
        EngineConfig::from_env()?
    } else {
        match preset.to_lowercase().as_str() {
            "default" => EngineConfig::default(),
            "development" | "dev" => EngineConfig::development(),
            "production" | "prod" => EngineConfig::production(),
            other => anyhow::bail!("unknown preset {:?} (expected default, development or production)", other),
        }
    };
    config.validate()?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_detectors() {
    println!("┌─────────────────────────────────────────────────────────────────┐");
    println!("│ FinTrace detectors                                              │");
    println!("├─────────────────────────────────────────────────────────────────┤");
    for metadata in fintrace::catalog::detectors() {
        println!(
            "│  [{:<11}] {:<26} - {}",
            metadata.search.as_str(),
            metadata.id,
            metadata.description
        );
    }
    println!("└─────────────────────────────────────────────────────────────────┘");
}

fn write_graph_view(result: &EngineOutput, graph: &TransactionGraph, path: &Path, pretty: bool) -> anyhow::Result<()> {
    let view = result.graph_view(graph);
    std::fs::write(path, to_json(&view, pretty)?).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), nodes = view.nodes.len(), links = view.links.len(), "Graph view written");
    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn print_summary(result: &EngineOutput) {
    let report = &result.report;
    let summary = &report.summary;
    let breakdown = summary.patterns_breakdown;

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              FinTrace Detection Summary                          ║");
    println!("╚══════════════════════════════════════════════════════════════════╝\n");

    println!("Accounts analyzed:   {}", summary.total_accounts_analyzed);
    println!("Suspicious accounts: {}", summary.suspicious_accounts_flagged);
    println!("High risk (>= 80):   {}", report.high_risk_count(80));
    println!(
        "Fraud rings:         {} (cycles {}, fan-in {}, fan-out {}, shell {})",
        summary.fraud_rings_detected, breakdown.cycles, breakdown.fan_in, breakdown.fan_out, breakdown.shell_networks
    );
    match &report.kingpin {
        Some(kingpin) => println!(
            "Kingpin:             {} (flow {:.2}, {} connections)",
            kingpin.account_id, kingpin.total_flow, kingpin.connections
        ),
        None => println!("Kingpin:             none"),
    }

    println!("\nRings:");
    for ring in &report.fraud_rings {
        println!(
            "  {} [{:<13}] risk {:>2}  {}  {}",
            ring.ring_id,
            ring.pattern_type.as_str(),
            ring.risk_score,
            ring.details,
            ring.member_accounts.join(" → ")
        );
    }

    println!("\nTop accounts:");
    for account in report.suspicious_accounts.iter().take(10) {
        println!(
            "  {:<14} risk {:>2}  {}",
            account.account_id,
            account.risk_score,
            account.reasons.join(", ")
        );
    }

    println!("\nDetectors:");
    for detector in &result.stats.detectors {
        let status = if detector.failed {
            "failed"
        } else if detector.truncated {
            "truncated"
        } else {
            "ok"
        };
        println!(
            "  {:<26} {:>8} µs  {:>4} found  {}",
            detector.detector, detector.elapsed_us, detector.findings, status
        );
    }
}
