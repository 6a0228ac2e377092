//! Process configuration.
//!
//! Loaded from `config.json` via [`Config::from_file`]; any read or parse
//! failure falls back to [`Config::default`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SocketCAN interface name used for live capture (e.g. "can0", "vcan0").
    pub can_interface: String,
    /// Path to the PGN catalog JSON document.
    #[serde(default = "default_catalog_path")]
    pub pgn_catalog_path: String,
    /// Apply the PGN 130306 `Reference` bit-offset correction.
    #[serde(default)]
    pub apply_catalog_corrections: bool,
    #[serde(default)]
    pub source_filter: SourceFilterConfig,
    #[serde(default)]
    pub nmea0183: BroadcastConfig,
    #[serde(default)]
    pub json: BroadcastConfig,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

fn default_catalog_path() -> String {
    "pgns.json".to_string()
}

/// One broadcast server's port and production interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub port: u16,
    pub interval_ms: u64,
}

impl BroadcastConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        // Overridden per-server by `Config::default` below; this exists only
        // so `#[serde(default)]` has something to fall back to.
        BroadcastConfig { port: 0, interval_ms: 1000 }
    }
}

/// CSV logger output directory and sampling interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvConfig {
    pub directory: String,
    pub interval_ms: u64,
}

impl CsvConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig {
            directory: "saildata".to_string(),
            interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory where log files will be stored.
    pub directory: String,
    /// Log file name prefix (date will be appended).
    pub file_prefix: String,
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "./logs".to_string(),
            file_prefix: "nmea_router".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceFilterConfig {
    /// Map of PGN to allowed source address.
    /// If a PGN is present in this map, only messages from the specified source will be accepted.
    /// If a PGN is not in the map, all sources are accepted.
    #[serde(default)]
    pub pgn_source_map: HashMap<u32, u8>,
}

impl SourceFilterConfig {
    /// Check if a message should be accepted based on its PGN and source.
    /// Returns true if:
    /// - No filter is configured for this PGN (accept all sources)
    /// - A filter is configured and the source matches
    pub fn should_accept(&self, pgn: u32, source: u8) -> bool {
        match self.pgn_source_map.get(&pgn) {
            Some(&allowed_source) => source == allowed_source,
            None => true,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Create default configuration: vcan0, default PGN catalog path, the
    /// two broadcast ports, and the CSV/logging defaults above.
    pub fn default() -> Self {
        Config {
            can_interface: "vcan0".to_string(),
            pgn_catalog_path: default_catalog_path(),
            apply_catalog_corrections: false,
            source_filter: SourceFilterConfig::default(),
            nmea0183: BroadcastConfig { port: 10110, interval_ms: 1000 },
            json: BroadcastConfig { port: 10111, interval_ms: 500 },
            csv: CsvConfig::default(),
            logging: LogConfig::default(),
        }
    }
}
