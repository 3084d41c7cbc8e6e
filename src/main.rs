// BOM Weather Tracker: forecast history collector
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod errors;
mod models;
mod services;

use services::collector::collect_forecasts;
use services::fetcher::BomClient;

const USER_AGENT: &str = "bom-weather-tracker/0.1 (forecast history collector)";

/// Collect weather forecasts from the BOM for all configured locations and
/// merge them into Git-friendly per-location JSON history files.
#[derive(Debug, Parser)]
#[command(name = "bom-weather-tracker", version)]
struct Cli {
    /// Path to the locations.json configuration file
    #[arg(long, default_value = "data/locations.json")]
    config: PathBuf,

    /// Base directory for data files
    #[arg(long, default_value = "data")]
    data: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(long, short)]
    verbose: bool,

    /// Filter to a single city name (e.g. "Sydney")
    #[arg(long)]
    city: Option<String>,

    /// Collection date override (YYYY-MM-DD, defaults to today in local time)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "bom_weather_tracker=debug"
    } else {
        "bom_weather_tracker=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let collection_date = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let client = BomClient::new(USER_AGENT);
    let result = collect_forecasts(
        &client,
        &cli.config,
        &cli.data,
        collection_date,
        cli.city.as_deref(),
    )
    .await;

    if result.total == 0 {
        println!("No locations to process");
        for error in &result.errors {
            println!("  - {}", error);
        }
        return ExitCode::from(2);
    }

    println!("\nCollection Summary:");
    println!("  Total locations: {}", result.total);
    println!("  Successes: {}", result.successes);
    println!("  Failures: {}", result.failures);

    if result.failures > 0 {
        println!("\nFailed locations:");
        for error in &result.errors {
            println!("  - {}", error);
        }
    }

    if result.failures == result.total {
        ExitCode::from(2)
    } else if result.failures > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
