//! Funnel Pulse — conversion-funnel metrics and outlier detection engine.
//!
//! Loads a funnel export (or generates mock data), runs the analysis
//! pipeline, and prints the resulting report as JSON.

mod mock;
mod pipeline;

use chrono::Utc;
use clap::Parser;
use funnel_cache::{estimate_storage_usage, BatchProcessor};
use funnel_core::config::AppConfig;
use funnel_core::types::FunnelData;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "funnel-pulse")]
#[command(about = "Conversion-funnel metrics and outlier detection engine")]
#[command(version)]
struct Cli {
    /// Funnel export to analyze (JSON). Mock data is generated if omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Outlier deviation threshold (overrides config)
    #[arg(long, env = "FUNNEL_PULSE__ANALYSIS__OUTLIER_THRESHOLD")]
    threshold: Option<f64>,

    /// Length of the ranked opportunity/issue lists (overrides config)
    #[arg(long, env = "FUNNEL_PULSE__ANALYSIS__RANKED_LIMIT")]
    top_limit: Option<usize>,

    /// Use the mock industry baseline instead of deriving one from the data
    #[arg(long, default_value_t = false)]
    mock_baseline: bool,

    /// Days of mock historical records to run through batch planning
    #[arg(long, default_value_t = 45)]
    history_days: i64,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing; logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funnel_pulse=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Funnel Pulse starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(threshold) = cli.threshold {
        config.analysis.outlier_threshold = threshold;
    }
    if let Some(limit) = cli.top_limit {
        config.analysis.ranked_limit = limit;
    }

    info!(
        property_id = %config.property_id,
        threshold = config.analysis.outlier_threshold,
        "Configuration loaded"
    );

    let data: FunnelData = match &cli.input {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        }
        None => {
            info!("No input file given, generating mock funnel data");
            mock::generate_mock_funnel_data(&config.property_id, &config.date_range)
        }
    };

    let explicit_baseline = cli.mock_baseline.then(mock::mock_baseline);
    let report = pipeline::run_analysis(&config, &data, explicit_baseline)?;

    // Size the historical series into storage-bounded batches and report
    // how the full payload sits against the external quota.
    let history = mock::generate_historical_data(cli.history_days);
    let processor = BatchProcessor::new(&config.storage);
    let partition = processor.partition_by_retention(&history, Utc::now());
    let batches = processor.batch_records(&partition.recent, None)?;
    let estimate = estimate_storage_usage(&report, &config.storage)?;
    info!(
        batches = batches.len(),
        retained = partition.recent.len(),
        older = partition.older.len(),
        report_kb = estimate.size_kb,
        quota_used_percent = estimate.usage_percent,
        "Historical batch plan ready"
    );
    if let Some(warning) = &estimate.warning {
        warn!(warning = %warning, "Report approaches the storage quota");
    }

    let rendered = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{rendered}");

    Ok(())
}
