//! FAIRLINE: cross-bookmaker odds normalization and EV ranking.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the EV pipeline and scans the quote snapshot once, or on an
//! interval in watch mode with graceful shutdown.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use fairline::config::AppConfig;
use fairline::data::snapshot::FileQuoteSource;
use fairline::engine::scanner::Scanner;
use fairline::matching::catalog::MarketCatalog;
use fairline::storage;
use fairline::strategy::EvPipeline;
use fairline::types::ScanReport;

const BANNER: &str = r#"
 ___ _   ___ ___ _    ___ _  _ ___
| __/_\ |_ _| _ \ |  |_ _| \| | __|
| _/ _ \ | ||   / |__ | || .` | _|
|_/_/ \_\___|_|_\____|___|_|\_|___|

  Fair odds from the sharp side, EV from the soft side
"#;

/// Rank +EV prices across bookmakers from a quote snapshot.
#[derive(Parser, Debug)]
#[command(name = "fairline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Quote snapshot to scan (overrides scanner.snapshot_path)
    #[arg(short, long)]
    quotes: Option<String>,

    /// De-vig method: multiplicative, power, additive or worstCase
    #[arg(short, long)]
    method: Option<String>,

    /// Write the ranked report here (overrides scanner.output_path)
    #[arg(short, long)]
    output: Option<String>,

    /// Re-scan every scanner.interval_secs until Ctrl+C
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let mut cfg = if Path::new(&cli.config).exists() {
        AppConfig::load(&cli.config)?
    } else {
        warn!(path = %cli.config, "Config file not found, using defaults");
        AppConfig::default()
    };
    apply_overrides(&mut cfg, &cli);

    println!("{BANNER}");

    let catalog = MarketCatalog::from_config(&cfg.markets);
    let pipeline = EvPipeline::new(cfg.engine.clone(), catalog)?;
    info!(
        method = %pipeline.method(),
        markets = pipeline.catalog().len(),
        snapshot = %cfg.scanner.snapshot_path,
        min_ev = cfg.engine.min_ev_percent,
        sharp_books = ?cfg.engine.sharp_books,
        "FAIRLINE starting up"
    );

    let scanner = Scanner::new(FileQuoteSource::new(&cfg.scanner.snapshot_path), pipeline);

    if !cli.watch {
        let report = scanner.scan_once().await?;
        publish(&report, &cfg)?;
        return Ok(());
    }

    // -- Watch loop ------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.scanner.interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.scanner.interval_secs,
        "Entering watch loop. Press Ctrl+C to stop."
    );

    let mut scans = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match scanner.scan_once().await {
                    Ok(report) => {
                        scans += 1;
                        if let Err(e) = publish(&report, &cfg) {
                            error!(error = %e, "Failed to publish report");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Scan failed, retrying next tick");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(scans, "FAIRLINE shut down cleanly.");
    Ok(())
}

/// CLI flags win over the config file.
fn apply_overrides(cfg: &mut AppConfig, cli: &Cli) {
    if let Some(quotes) = &cli.quotes {
        cfg.scanner.snapshot_path = quotes.clone();
    }
    if let Some(method) = &cli.method {
        cfg.engine.devig_method = method.clone();
    }
    if let Some(output) = &cli.output {
        cfg.scanner.output_path = Some(output.clone());
    }
}

/// Print the top of the ranking and persist the report if configured.
fn publish(report: &ScanReport, cfg: &AppConfig) -> Result<()> {
    let top = report.top(cfg.scanner.top_n);
    if top.is_empty() {
        println!("No opportunities above {:.1}% EV.", cfg.engine.min_ev_percent);
    } else {
        println!(
            "Top {} of {} opportunities ({} de-vig):",
            top.len(),
            report.opportunities.len(),
            report.devig_method
        );
        for (i, opp) in top.iter().enumerate() {
            println!("{:>3}. {opp}", i + 1);
        }
    }

    if let Some(path) = &cfg.scanner.output_path {
        storage::save_report(report, path)?;
        info!(path = %path, "Report written");
    }
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fairline=info"));

    let json_logging = std::env::var("FAIRLINE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
