//! Location configuration.
//!
//! The tracked locations are read from a JSON document of the form
//! `{"locations": [{"product_id": ..., "city_name": ..., "state": ...}, ...]}`.
//! Invalid entries are skipped with a warning; a missing or malformed file is
//! fatal for the run.

use serde::Deserialize;
use std::path::Path;

use crate::errors::CollectError;

/// Valid Australian state/territory abbreviations.
const VALID_STATES: [&str; 8] = ["NSW", "VIC", "QLD", "SA", "WA", "TAS", "NT", "ACT"];

/// A single tracked BOM location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationConfig {
    /// BOM Product ID (e.g. "IDD10161")
    pub product_id: String,
    /// City name (e.g. "Alice Springs")
    pub city_name: String,
    /// State abbreviation, normalized to upper case (e.g. "NT")
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    locations: Vec<RawLocation>,
}

/// A raw, not-yet-validated configuration entry. Missing fields deserialize
/// as empty strings so that one bad entry never fails the whole file.
#[derive(Debug, Deserialize)]
struct RawLocation {
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    city_name: String,
    #[serde(default)]
    state: String,
}

/// Validate a single configuration entry, returning `None` (with a warning)
/// if any field is empty or the state abbreviation is unknown.
fn validate_entry(entry: &RawLocation) -> Option<LocationConfig> {
    let product_id = entry.product_id.trim();
    let city_name = entry.city_name.trim();
    let state = entry.state.trim().to_uppercase();

    if product_id.is_empty() {
        tracing::warn!("Invalid config entry: missing or empty product_id: {:?}", entry);
        return None;
    }
    if city_name.is_empty() {
        tracing::warn!("Invalid config entry: missing or empty city_name: {:?}", entry);
        return None;
    }
    if !VALID_STATES.contains(&state.as_str()) {
        tracing::warn!(
            "Invalid config entry: invalid state '{}' for {}. Valid states: {:?}",
            entry.state,
            city_name,
            VALID_STATES
        );
        return None;
    }

    Some(LocationConfig {
        product_id: product_id.to_string(),
        city_name: city_name.to_string(),
        state,
    })
}

/// Load and validate the location configuration file.
///
/// Invalid entries are logged and skipped. A missing file or invalid JSON is
/// returned as an error; the caller aborts the run with zero locations
/// processed in that case.
pub fn load_config(config_path: &Path) -> Result<Vec<LocationConfig>, CollectError> {
    tracing::info!("Loading configuration from {}", config_path.display());

    if !config_path.exists() {
        return Err(CollectError::ConfigNotFound(config_path.to_path_buf()));
    }

    let content = std::fs::read_to_string(config_path)?;
    let parsed: ConfigFile = serde_json::from_str(&content)
        .map_err(|e| CollectError::ConfigInvalid(e.to_string()))?;

    let valid: Vec<LocationConfig> = parsed
        .locations
        .iter()
        .filter_map(validate_entry)
        .collect();

    tracing::info!("Loaded {} valid locations from configuration", valid.len());
    Ok(valid)
}
