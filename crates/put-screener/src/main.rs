//! put-screener: rank put-selling candidates from a stock screener export.
//!
//! Loads the candidate universe, computes volatility-adjusted floors per
//! symbol, matches each floor to the nearest put strike and writes the
//! surviving rows as CSV.
//!
//! Usage:
//!   cargo run -p put-screener -- --input ~/Downloads --floors 20:1,20:2,50:2
//!   cargo run -p put-screener -- --input screener.csv --trend 50,100,200 --delta-floor -0.15
//!   cargo run -p put-screener -- --source yahoo --expiration 2025-08-15

mod cli;

use anyhow::Context;
use barchart_client::{BarchartClient, BarchartConfig};
use chrono::Local;
use clap::Parser;
use cli::{Args, Source};
use screener_core::QuoteSource;
use screening_pipeline::{build_report, load_candidates, screen_candidates, write_csv, EnrichmentPipeline};
use std::sync::Arc;
use yahoo_client::YahooFinanceClient;

const DEFAULT_LOG_FILTER: &str = "put_screener=info,screening_pipeline=info,barchart_client=warn,yahoo_client=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = Arc::new(
        args.to_config(Local::now().date_naive())
            .context("Invalid screener configuration")?,
    );

    let candidates = load_candidates(&args.input, &config)
        .with_context(|| format!("Failed to load candidates from {}", args.input.display()))?;
    tracing::info!(
        "{} candidates, floors [{}], expiration {}",
        candidates.len(),
        config
            .floor_variants
            .iter()
            .map(|v| v.tag())
            .collect::<Vec<_>>()
            .join(", "),
        config.expiration_date
    );

    let barchart = Arc::new(BarchartClient::new(
        BarchartConfig::from_env().with_timeout(config.request_timeout()),
    ));
    let quotes: Arc<dyn QuoteSource> = match args.source {
        Source::Barchart => Arc::clone(&barchart) as Arc<dyn QuoteSource>,
        Source::Yahoo => Arc::new(YahooFinanceClient::new(config.request_timeout())),
    };

    let pipeline = EnrichmentPipeline::new(quotes, barchart, Arc::clone(&config));
    let outcome = screen_candidates(&pipeline, &candidates).await;

    let report = build_report(&outcome.results);
    write_csv(&args.output, &report)
        .with_context(|| format!("Failed to write results to {}", args.output.display()))?;

    tracing::info!("============================================");
    tracing::info!("Screen complete");
    tracing::info!("  Candidates:        {}", candidates.len());
    tracing::info!("  Symbols enriched:  {}", outcome.enrichment.enriched_symbols);
    tracing::info!("  Symbols skipped:   {}", outcome.enrichment.skipped.len());
    tracing::info!("  Rows kept:         {}", report.len());
    tracing::info!("  Output:            {}", args.output.display());
    tracing::info!("============================================");

    for row in report.iter().take(args.top) {
        tracing::info!(
            "{:<8} {:<10} floor {:>9.2} strike {:>9.2} bid {:>7} ask {:>7} profit {:.4}",
            row.symbol,
            row.floor_tag,
            row.floor_value,
            row.strike_price,
            fmt_price(row.bid_price),
            fmt_price(row.ask_price),
            row.profitability
        );
    }

    Ok(())
}

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

fn fmt_price(price: Option<f64>) -> String {
    price.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".to_string())
}
