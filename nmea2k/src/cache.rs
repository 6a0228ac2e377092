//! Last-value state cache.
//!
//! A fixed table of PGN/field pairs gets mirrored into a flat, mutex-guarded
//! map of cache-key to last-seen value, so that downstream producers
//! (NMEA 0183 sentences, the debug printer, the JSON stream) can read the
//! vessel's current state without re-decoding or replaying frames. The cache
//! registers itself as an ordinary [`Consumer`] in the fan-out, same as
//! every other subscriber.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::catalog::{Catalog, PgnDescriptor};
use crate::consumer::Consumer;
use crate::error::ConsumerError;
use crate::record::{DecodedRecord, FieldValue};

/// One binding from a decoded field to a cache key.
struct Binding {
    pgn: u32,
    field: &'static str,
    key: &'static str,
}

const BINDINGS: &[Binding] = &[
    Binding { pgn: 127250, field: "Heading", key: "Heading" },
    Binding { pgn: 128259, field: "SpeedWaterReferenced", key: "SpeedThroughWater" },
    Binding { pgn: 128267, field: "Depth", key: "Depth" },
    Binding { pgn: 128267, field: "Offset", key: "DepthOffset" },
    Binding { pgn: 129025, field: "Longitude", key: "Longitude" },
    Binding { pgn: 129025, field: "Latitude", key: "Latitude" },
    Binding { pgn: 129026, field: "SOG", key: "SOG" },
    Binding { pgn: 129026, field: "COG", key: "COG" },
    Binding { pgn: 130306, field: "WindSpeed", key: "WindSpeed" },
    Binding { pgn: 130306, field: "WindAngle", key: "WindAngle" },
    Binding { pgn: 130306, field: "Reference", key: "WindReference" },
    Binding { pgn: 129033, field: "Date", key: "Date" },
    Binding { pgn: 129033, field: "Time", key: "Time" },
];

#[derive(Clone)]
struct CachedValue {
    value: FieldValue,
    units: String,
}

/// Thread-safe last-value cache, shared across the decoder thread and
/// whichever threads produce output from it.
pub struct StateCache {
    values: Mutex<HashMap<&'static str, CachedValue>>,
}

impl StateCache {
    /// Pre-populate every bound key as "unknown", resolving its units from
    /// the catalog once at construction so `units()` never changes for the
    /// lifetime of the cache.
    pub fn new(catalog: &Catalog) -> Self {
        let mut values = HashMap::new();
        for binding in BINDINGS {
            let units = catalog.units_for_field(binding.pgn, binding.field);
            values.entry(binding.key).or_insert(CachedValue { value: FieldValue::Unknown, units });
        }
        StateCache { values: Mutex::new(values) }
    }

    /// Record any bound fields present on this decoded PGN.
    pub fn observe(&self, pgn: u32, record: &DecodedRecord) {
        let mut values = self.values.lock().unwrap();
        for binding in BINDINGS {
            if binding.pgn != pgn {
                continue;
            }
            if let Some(value) = record.get(binding.field) {
                if let Some(entry) = values.get_mut(binding.key) {
                    entry.value = value.clone();
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.values.lock().unwrap().get(key).map(|c| c.value.clone())
    }

    pub fn units(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).map(|c| c.units.clone())
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.values.lock().unwrap().keys().copied().collect()
    }
}

impl Consumer for StateCache {
    fn consume(&mut self, pgn: u32, record: &DecodedRecord, _descriptor: &PgnDescriptor) -> Result<(), ConsumerError> {
        self.observe(pgn, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::Destination;
    use crate::record::DecodedField;

    fn depth_catalog() -> Catalog {
        Catalog::load_from_str(
            r#"{"PGNs": [
                {"PGN": 128267, "Description": "Water Depth", "Length": 8, "Fields": [
                    {"Name": "Depth", "BitOffset": 8, "BitLength": 32, "Units": "m"},
                    {"Name": "Offset", "BitOffset": 40, "BitLength": 16, "Units": "m"}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    fn record_with(name: &str, value: FieldValue) -> DecodedRecord {
        let mut record = DecodedRecord::new(128267, 3, 23, Destination::Broadcast);
        record.push(DecodedField {
            name: name.to_string(),
            long_name: name.to_string(),
            value,
            raw_value: 0.0,
            units: "m".to_string(),
        });
        record
    }

    #[test]
    fn unbound_keys_start_unknown_with_resolved_units() {
        let catalog = depth_catalog();
        let cache = StateCache::new(&catalog);
        assert_eq!(cache.get("Depth"), Some(FieldValue::Unknown));
        assert_eq!(cache.units("Depth").as_deref(), Some("m"));
    }

    #[test]
    fn observes_bound_fields_only() {
        let catalog = depth_catalog();
        let cache = StateCache::new(&catalog);

        let mut record = record_with("Depth", FieldValue::Number(3.5));
        record.push(DecodedField {
            name: "SomeUnboundField".to_string(),
            long_name: "SomeUnboundField".to_string(),
            value: FieldValue::Number(1.0),
            raw_value: 1.0,
            units: String::new(),
        });

        cache.observe(128267, &record);

        assert_eq!(cache.get("Depth"), Some(FieldValue::Number(3.5)));
        assert_eq!(cache.units("Depth").as_deref(), Some("m"));
        assert_eq!(cache.get("SomeUnboundField"), None);
    }

    #[test]
    fn depth_offset_renamed_from_offset_field() {
        let catalog = depth_catalog();
        let cache = StateCache::new(&catalog);
        let record = record_with("Offset", FieldValue::Number(-0.2));

        cache.observe(128267, &record);

        assert_eq!(cache.get("DepthOffset"), Some(FieldValue::Number(-0.2)));
        assert_eq!(cache.get("Offset"), None);
    }

    #[test]
    fn later_observation_overwrites_earlier() {
        let catalog = depth_catalog();
        let cache = StateCache::new(&catalog);

        cache.observe(128267, &record_with("Depth", FieldValue::Number(1.0)));
        cache.observe(128267, &record_with("Depth", FieldValue::Number(2.0)));

        assert_eq!(cache.get("Depth"), Some(FieldValue::Number(2.0)));
    }
}
