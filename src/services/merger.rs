//! Forecast merge engine and archival splitter.
//!
//! The heart of the tracker: each collection run folds the freshly parsed
//! forecast into the location's stored history without losing previously
//! recorded predictions, then partitions the history into a "current" subset
//! (target date today or later) and an "archived" subset (target date passed).
//!
//! Field-level merge rule: a new value overrides a stored one only when the
//! new value is present. For the text fields "present" means non-empty: an
//! empty string is treated the same as absent, matching the semantics of the
//! data already stored on disk.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{ForecastRecord, LocationData, PredictionEntry};
use crate::services::parser::ParsedForecast;

/// Merge a new prediction entry with an existing one at the same days-ahead
/// slot. New present values win; absent values preserve what was stored, so a
/// partial or degraded parse never erases previously captured detail.
fn merge_prediction_entry(existing: &PredictionEntry, new: PredictionEntry) -> PredictionEntry {
    PredictionEntry {
        icon_code: new.icon_code.or(existing.icon_code),
        temp_min: new.temp_min.or(existing.temp_min),
        temp_max: new.temp_max.or(existing.temp_max),
        precipitation_prob: non_empty_or(new.precipitation_prob, &existing.precipitation_prob),
        precis: non_empty_or(new.precis, &existing.precis),
        forecast: non_empty_or(new.forecast, &existing.forecast),
    }
}

/// Text-field override rule: keep the new value only if it is a non-empty
/// string, otherwise fall back to the existing value.
fn non_empty_or(new: Option<String>, existing: &Option<String>) -> Option<String> {
    match new {
        Some(s) if !s.is_empty() => Some(s),
        _ => existing.clone(),
    }
}

/// Merge a parsed forecast into existing location data.
///
/// Creates a new `LocationData` when `existing` is `None`. Each parsed day is
/// stored under its target date at the slot `days_ahead = target date -
/// collection date`; an entry already at that slot is merged field-by-field.
/// Duplicate target dates within one parse fold sequentially in list order.
/// Both key levels stay sorted ascending (`BTreeMap`).
pub fn merge_forecast(
    existing: Option<LocationData>,
    parsed: &ParsedForecast,
    collection_date: NaiveDate,
    state: &str,
) -> LocationData {
    let mut data = existing.unwrap_or_else(|| LocationData {
        product_id: parsed.product_id.clone(),
        city_name: parsed.city_name.clone(),
        state: state.to_string(),
        timezone: parsed.timezone.clone(),
        forecasts: BTreeMap::new(),
    });

    for day in &parsed.forecasts {
        let date_key = day.forecast_date.format("%Y-%m-%d").to_string();
        let days_ahead = (day.forecast_date - collection_date).num_days();

        let new_entry = PredictionEntry {
            icon_code: day.icon_code,
            temp_min: day.temp_min,
            temp_max: day.temp_max,
            precipitation_prob: day.precipitation_prob.clone(),
            precis: day.precis.clone(),
            forecast: day.forecast.clone(),
        };

        let record = data.forecasts.entry(date_key).or_default();
        let merged = match record.get(&days_ahead) {
            Some(existing_entry) => merge_prediction_entry(existing_entry, new_entry),
            None => new_entry,
        };
        record.insert(days_ahead, merged);
    }

    tracing::debug!(
        "Merged {} forecast days for {} (collection date: {})",
        parsed.forecasts.len(),
        data.city_name,
        collection_date
    );

    data
}

/// Partition location data into current and archived subsets by target date.
///
/// Records dated `reference_date` or later stay current; anything strictly
/// earlier moves to the archived subset. This is a pure partition: every
/// record ends up in exactly one of the two outputs. Returns `None` for the
/// archive when nothing has lapsed.
pub fn split_archive(
    data: LocationData,
    reference_date: NaiveDate,
) -> (LocationData, Option<LocationData>) {
    let LocationData {
        product_id,
        city_name,
        state,
        timezone,
        forecasts,
    } = data;

    let mut current_forecasts: BTreeMap<String, ForecastRecord> = BTreeMap::new();
    let mut archived_forecasts: BTreeMap<String, ForecastRecord> = BTreeMap::new();

    for (date_key, record) in forecasts {
        let lapsed = NaiveDate::parse_from_str(&date_key, "%Y-%m-%d")
            .map(|d| d < reference_date)
            .unwrap_or(false);
        if lapsed {
            archived_forecasts.insert(date_key, record);
        } else {
            current_forecasts.insert(date_key, record);
        }
    }

    let identity = LocationData {
        product_id,
        city_name,
        state,
        timezone,
        forecasts: BTreeMap::new(),
    };

    let archived = if archived_forecasts.is_empty() {
        None
    } else {
        tracing::debug!(
            "Archiving {} lapsed forecast records for {}",
            archived_forecasts.len(),
            identity.city_name
        );
        Some(LocationData {
            forecasts: archived_forecasts,
            ..identity.clone()
        })
    };

    let current = LocationData {
        forecasts: current_forecasts,
        ..identity
    };
    (current, archived)
}
