//! Collection run orchestrator.
//!
//! Iterates the configured locations in order and runs the full pipeline for
//! each: fetch → parse → read current file → merge → split → write current →
//! merge+write archive. Every per-location failure is caught at the loop
//! boundary and recorded as a message in the run summary; nothing short of a
//! missing configuration file aborts the run.
//!
//! Processing is strictly sequential; the data files are read-modify-write
//! and nothing guards against a second concurrent run, so one run at a time
//! is a precondition of the data directory.

use chrono::NaiveDate;
use std::path::Path;
use std::time::Instant;

use crate::config::{load_config, LocationConfig};
use crate::services::fetcher::BomClient;
use crate::services::merger::{merge_forecast, split_archive};
use crate::services::parser::parse_forecast_xml;
use crate::services::store::{
    archive_file_path, location_file_path, read_location_file, write_archive_file,
    write_location_file,
};

/// Summary of one collection run across all configured locations.
#[derive(Debug, Default)]
pub struct CollectionResult {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub errors: Vec<String>,
}

/// Collect the forecast for a single location.
///
/// Returns an error message on failure, `None` on success. A failed archive
/// write is logged as a warning only; the authoritative current file was
/// already persisted at that point.
pub async fn collect_single_location(
    client: &BomClient,
    location: &LocationConfig,
    data_dir: &Path,
    collection_date: NaiveDate,
) -> Option<String> {
    let LocationConfig {
        product_id,
        city_name,
        state,
    } = location;

    tracing::debug!("Fetching forecast for {} ({})", city_name, product_id);
    let xml = match client.fetch_forecast_xml(product_id).await {
        Some(xml) => xml,
        None => return Some(format!("Failed to fetch XML for {} ({})", city_name, product_id)),
    };

    let parsed = match parse_forecast_xml(&xml) {
        Some(parsed) => parsed,
        None => return Some(format!("Failed to parse XML for {} ({})", city_name, product_id)),
    };

    let file_path = location_file_path(data_dir, state, city_name);
    let existing = read_location_file(&file_path);

    let merged = merge_forecast(existing, &parsed, collection_date, state);
    let (current, archived) = split_archive(merged, collection_date);

    if let Err(e) = write_location_file(&file_path, &current) {
        return Some(format!(
            "Failed to write file for {} ({}): {}",
            city_name, product_id, e
        ));
    }

    if let Some(archived) = archived {
        let archive_path = archive_file_path(data_dir, state, city_name);
        if let Err(e) = write_archive_file(&archive_path, archived) {
            // Best-effort: the current file is already persisted.
            tracing::warn!(
                "Failed to write archive file for {} ({}): {}",
                city_name,
                product_id,
                e
            );
        }
    }

    tracing::debug!("Successfully collected forecast for {}", city_name);
    None
}

/// Run a full collection across all configured locations.
///
/// A missing or unparsable configuration file is recorded as an error with
/// zero locations processed. An unmatched `--city` filter likewise. All other
/// failures are per-location and never stop the loop.
pub async fn collect_forecasts(
    client: &BomClient,
    config_path: &Path,
    data_dir: &Path,
    collection_date: NaiveDate,
    city_filter: Option<&str>,
) -> CollectionResult {
    let start = Instant::now();
    let mut result = CollectionResult::default();

    let mut locations = match load_config(config_path) {
        Ok(locations) => locations,
        Err(e) => {
            tracing::error!("{}", e);
            result.errors.push(e.to_string());
            return result;
        }
    };

    if let Some(city) = city_filter {
        locations.retain(|loc| loc.city_name.eq_ignore_ascii_case(city));
        if locations.is_empty() {
            let msg = format!("No location found matching city: {}", city);
            tracing::error!("{}", msg);
            result.errors.push(msg);
            return result;
        }
    }

    result.total = locations.len();
    tracing::info!(
        "Starting forecast collection for {} locations (collection date: {})",
        result.total,
        collection_date
    );

    if result.total == 0 {
        tracing::warn!("No locations found in configuration");
        return result;
    }

    for (i, location) in locations.iter().enumerate() {
        tracing::info!(
            "Processing location {}/{}: {} ({})",
            i + 1,
            result.total,
            location.city_name,
            location.product_id
        );

        match collect_single_location(client, location, data_dir, collection_date).await {
            None => {
                result.successes += 1;
                tracing::info!("Successfully collected forecast for {}", location.city_name);
            }
            Some(error) => {
                result.failures += 1;
                tracing::error!(
                    "Failed to collect forecast for {}: {}",
                    location.city_name,
                    error
                );
                result.errors.push(error);
            }
        }
    }

    tracing::info!(
        "Collection completed in {:.1}s - Total: {}, Successes: {}, Failures: {}",
        start.elapsed().as_secs_f64(),
        result.total,
        result.successes,
        result.failures
    );
    if result.failures > 0 {
        for error in &result.errors {
            tracing::warn!("  - {}", error);
        }
    }

    result
}
