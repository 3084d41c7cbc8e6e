//! Persisted forecast data model.
//!
//! One `LocationData` JSON document is stored per location (plus a structurally
//! identical archive document). `BTreeMap` is used for both key levels so that
//! serialization order is always ascending; stable output means minimal diffs
//! when the data files live under version control.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::CollectError;

/// One forecast issuer's prediction for a single target date, captured at one
/// collection time. All fields are optional: `None` means "not reported this
/// cycle", not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionEntry {
    /// BOM forecast icon code
    pub icon_code: Option<i32>,
    /// Minimum temperature in °C
    pub temp_min: Option<i32>,
    /// Maximum temperature in °C
    pub temp_max: Option<i32>,
    /// Probability of precipitation text (e.g. "40%")
    pub precipitation_prob: Option<String>,
    /// Short summary text
    pub precis: Option<String>,
    /// Long-form forecast text
    pub forecast: Option<String>,
}

/// All predictions ever collected for one target date, keyed by days-ahead
/// (0 = forecast issued on the target date itself). At most one entry per
/// days-ahead value; JSON serializes the integer keys as strings.
pub type ForecastRecord = BTreeMap<i64, PredictionEntry>;

/// Complete stored history for one location.
///
/// Fields are declared alphabetically; serde emits struct keys in declaration
/// order, and the stored documents list their top-level keys sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    /// City name (e.g. "Alice Springs")
    pub city_name: String,
    /// Forecast records keyed by target date as an ISO date string
    #[serde(default)]
    pub forecasts: BTreeMap<String, ForecastRecord>,
    /// BOM Product ID (e.g. "IDD10161")
    pub product_id: String,
    /// State abbreviation (e.g. "NT")
    pub state: String,
    /// Timezone abbreviation from the issue time (e.g. "CST")
    pub timezone: String,
}

/// Serialize location data to JSON with 2-space indentation and sorted keys.
pub fn serialize_location_data(data: &LocationData) -> Result<String, CollectError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Deserialize a location JSON document back into `LocationData`.
pub fn deserialize_location_data(json: &str) -> Result<LocationData, CollectError> {
    Ok(serde_json::from_str(json)?)
}
