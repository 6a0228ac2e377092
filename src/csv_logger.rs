//! CSV state logger.
//!
//! Once a second, snapshot a fixed list of [`StateCache`] keys and append a
//! row to a CSV file whose name is stamped with the time the logger
//! started. The header (with units baked into the column names) is written
//! lazily on the first tick, so the cache has had a chance to resolve them.

use std::sync::Arc;

use chrono::Local;
use nmea2k::{FieldValue, StateCache};
use tracing::{error, info};

use crate::periodic::PeriodicWorker;

/// Column order for the CSV log.
const COLUMNS: &[&str] = &[
    "Heading",
    "SpeedThroughWater",
    "SOG",
    "COG",
    "WindSpeed",
    "WindAngle",
    "WindReference",
    "Depth",
    "DepthOffset",
    "Longitude",
    "Latitude",
];

/// Owns the CSV writer and the periodic worker that drives it. Dropping
/// this stops the logger (the worker thread keeps running as a fire-and-
/// forget background thread, but nothing else references the writer once
/// this is gone).
pub struct CsvLogger {
    _worker: PeriodicWorker,
}

impl CsvLogger {
    /// `directory` is created if it doesn't exist. The log file is named
    /// `saildata-<local timestamp>.csv`.
    pub fn new(directory: &str, interval: std::time::Duration, cache: Arc<StateCache>) -> std::io::Result<Self> {
        std::fs::create_dir_all(directory)?;

        let filename = format!("{directory}/saildata-{}.csv", Local::now().format("%Y-%m-%d-%H-%M"));
        let mut writer = csv::Writer::from_path(&filename)?;
        info!(file = %filename, "csv logger started");

        let mut header_written = false;

        let worker = PeriodicWorker::new(interval, move || {
            if !header_written {
                let header: Vec<String> = COLUMNS
                    .iter()
                    .map(|key| format!("{} ({})", key, cache.units(key).unwrap_or_default()))
                    .collect();
                if let Err(e) = writer.write_record(&header) {
                    error!(error = %e, "failed to write csv header");
                }
                header_written = true;
            }

            let row: Vec<String> = COLUMNS.iter().map(|key| format_value(cache.get(key))).collect();
            if let Err(e) = writer.write_record(&row) {
                error!(error = %e, "failed to write csv row");
            }
            if let Err(e) = writer.flush() {
                error!(error = %e, "failed to flush csv writer");
            }
        });

        Ok(CsvLogger { _worker: worker })
    }
}

fn format_value(value: Option<FieldValue>) -> String {
    match value {
        Some(FieldValue::Number(n)) => n.to_string(),
        Some(FieldValue::Text(t)) => t,
        Some(FieldValue::Unknown) | None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_value_renders_unknown_as_empty_string() {
        assert_eq!(format_value(Some(FieldValue::Unknown)), "");
        assert_eq!(format_value(None), "");
    }

    #[test]
    fn format_value_renders_number_and_text() {
        assert_eq!(format_value(Some(FieldValue::Number(3.5))), "3.5");
        assert_eq!(format_value(Some(FieldValue::Text("Apparent".to_string()))), "Apparent");
    }

    #[test]
    fn column_order_matches_state_cache_bindings() {
        assert_eq!(COLUMNS.len(), 11);
        assert_eq!(COLUMNS[0], "Heading");
        assert_eq!(COLUMNS[COLUMNS.len() - 1], "Latitude");
    }
}
