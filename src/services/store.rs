//! JSON file storage for location forecast data.
//!
//! One document per location at `{base}/{state}/{city}.json`, with lapsed
//! records accumulating at `{base}/archive/{state}/{city}.json`. Output uses
//! 2-space indentation and sorted keys so the files diff cleanly under
//! version control.
//!
//! The current file is replaced wholesale on every write; the archive file is
//! extended: its previous contents are read back and merged so that no
//! archived record is ever discarded.

use std::path::{Path, PathBuf};

use crate::errors::CollectError;
use crate::models::{
    deserialize_location_data, serialize_location_data, LocationData,
};

/// Path for a location's current forecast file: `{base}/{state}/{city}.json`.
pub fn location_file_path(base_dir: &Path, state: &str, city_name: &str) -> PathBuf {
    base_dir.join(state).join(format!("{}.json", city_name))
}

/// Path for a location's archive file: `{base}/archive/{state}/{city}.json`.
pub fn archive_file_path(base_dir: &Path, state: &str, city_name: &str) -> PathBuf {
    base_dir
        .join("archive")
        .join(state)
        .join(format!("{}.json", city_name))
}

/// Read an existing location JSON file.
///
/// Returns `None` when the file does not exist or cannot be parsed; the
/// caller treats both as "no prior history". Unreadable files are logged at
/// error level since they may indicate corruption worth investigating.
pub fn read_location_file(path: &Path) -> Option<LocationData> {
    if !path.exists() {
        tracing::debug!("Location file does not exist: {}", path.display());
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to read location file {}: {}", path.display(), e);
            return None;
        }
    };

    match deserialize_location_data(&content) {
        Ok(data) => {
            tracing::debug!("Successfully read location file: {}", path.display());
            Some(data)
        }
        Err(e) => {
            tracing::error!("Failed to parse location file {}: {}", path.display(), e);
            None
        }
    }
}

/// Merge newly archived records into an existing archive.
///
/// Whole records are inserted for dates the existing archive has never seen.
/// For shared dates, new days-ahead slots are inserted and existing slots
/// overwritten; a date only lapses once, so archived slots are write-once in
/// practice and last-write-wins is safe. No existing record is ever dropped.
pub fn merge_archive_data(
    existing_archive: Option<LocationData>,
    new_archive: LocationData,
) -> LocationData {
    let mut merged = match existing_archive {
        Some(existing) => existing,
        None => return new_archive,
    };

    for (date_key, record) in new_archive.forecasts {
        let target = merged.forecasts.entry(date_key).or_default();
        for (days_ahead, prediction) in record {
            target.insert(days_ahead, prediction);
        }
    }

    merged
}

/// Write location data to a JSON file, creating parent directories as needed.
pub fn write_location_file(path: &Path, data: &LocationData) -> Result<(), CollectError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serialize_location_data(data)?;
    std::fs::write(path, json)?;

    tracing::debug!("Successfully wrote location file: {}", path.display());
    Ok(())
}

/// Write newly archived data, merging with whatever the archive file already
/// holds so historical records accumulate across runs.
pub fn write_archive_file(path: &Path, data: LocationData) -> Result<(), CollectError> {
    let existing_archive = read_location_file(path);
    let merged = merge_archive_data(existing_archive, data);
    write_location_file(path, &merged)
}
