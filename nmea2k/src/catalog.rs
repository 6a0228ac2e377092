//! PGN catalog loading and normalization.
//!
//! The catalog is read once at startup from an external JSON document and
//! shared by reference among every other component; nothing mutates it after
//! [`Catalog::apply_known_corrections`] (opt-in) has had its chance to run.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "PGNs")]
    pgns: Vec<RawPgn>,
}

#[derive(Debug, Deserialize)]
struct RawPgn {
    #[serde(rename = "PGN")]
    pgn: u32,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Length")]
    length: u32,
    #[serde(rename = "Fields", default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "BitOffset")]
    bit_offset: Option<i64>,
    #[serde(rename = "BitLength")]
    bit_length: Option<i64>,
    #[serde(rename = "BitLengthVariable", default)]
    bit_length_variable: bool,
    #[serde(rename = "Signed", default)]
    signed: bool,
    #[serde(rename = "Type")]
    field_type: Option<String>,
    #[serde(rename = "Resolution")]
    resolution: Option<f64>,
    #[serde(rename = "Units")]
    units: Option<String>,
    #[serde(rename = "EnumValues")]
    enum_values: Option<Vec<RawEnumEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEnumEntry {
    value: serde_json::Value,
    name: String,
}

/// One field within a PGN descriptor.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Canonical, whitespace-stripped name; `None` for unnamed/reserved slots.
    pub name: Option<String>,
    pub long_name: String,
    pub bit_offset: Option<i64>,
    /// `None` means variable-length (catalog's `BitLength = -1` or `BitLengthVariable`).
    pub bit_length: Option<i64>,
    pub bit_length_variable: bool,
    pub signed: bool,
    pub field_type: String,
    pub resolution: f64,
    pub units: Option<String>,
    pub enum_values: Option<HashMap<i64, String>>,
    pub enum_mask: Option<i64>,
}

impl FieldDescriptor {
    /// Fields named `Reserved`, `SID`, or left unnamed are decoded positionally
    /// but never emitted.
    pub fn is_emitted(&self) -> bool {
        match &self.name {
            None => false,
            Some(n) => n != "Reserved" && n != "SID",
        }
    }
}

/// A single PGN's descriptor: length and ordered field layout.
#[derive(Debug, Clone)]
pub struct PgnDescriptor {
    pub pgn: u32,
    pub description: String,
    pub length: u32,
    pub fields: Vec<FieldDescriptor>,
}

/// The normalized, read-only PGN catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    pgns: HashMap<u32, PgnDescriptor>,
}

impl Catalog {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self, CatalogError> {
        let doc: RawDocument = match serde_json::from_str::<serde_json::Value>(contents) {
            Ok(value) => {
                let pgns_value = value.get("PGNs").ok_or(CatalogError::MissingPgns)?;
                RawDocument {
                    pgns: serde_json::from_value(pgns_value.clone())?,
                }
            }
            Err(e) => return Err(CatalogError::Json(e)),
        };

        let mut pgns = HashMap::with_capacity(doc.pgns.len());
        for raw_pgn in doc.pgns {
            let fields = raw_pgn.fields.into_iter().map(normalize_field).collect();
            pgns.insert(
                raw_pgn.pgn,
                PgnDescriptor {
                    pgn: raw_pgn.pgn,
                    description: raw_pgn.description,
                    length: raw_pgn.length,
                    fields,
                },
            );
        }

        Ok(Catalog { pgns })
    }

    pub fn get(&self, pgn: u32) -> Option<&PgnDescriptor> {
        self.pgns.get(&pgn)
    }

    pub fn contains(&self, pgn: u32) -> bool {
        self.pgns.contains_key(&pgn)
    }

    pub fn len(&self) -> usize {
        self.pgns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pgns.is_empty()
    }

    /// Find the units string declared for `field_name` within `pgn`, or `""`
    /// if the field has none (used by the state cache).
    pub fn units_for_field(&self, pgn: u32, field_name: &str) -> String {
        self.get(pgn)
            .and_then(|d| d.fields.iter().find(|f| f.name.as_deref() == Some(field_name)))
            .and_then(|f| f.units.clone())
            .unwrap_or_default()
    }

    /// Apply known catalog corrections. Off by default: call explicitly
    /// only when the loaded catalog is known to need it. Currently patches
    /// PGN 130306's `Reference` field to bit offset 45.
    pub fn apply_known_corrections(&mut self) {
        if let Some(pgn) = self.pgns.get_mut(&130306) {
            for field in &mut pgn.fields {
                if field.name.as_deref() == Some("Reference") {
                    field.bit_offset = Some(45);
                }
            }
        }
    }
}

fn normalize_field(raw: RawField) -> FieldDescriptor {
    let long_name = raw.name.clone().unwrap_or_default();
    let name = raw.name.map(|n| n.replace(' ', "")).filter(|n| !n.is_empty());

    let bit_length = if raw.bit_length == Some(-1) {
        None
    } else {
        raw.bit_length
    };

    let enum_values: Option<HashMap<i64, String>> = raw.enum_values.as_ref().map(|entries| {
        entries
            .iter()
            .filter_map(|e| {
                let key = match &e.value {
                    serde_json::Value::Number(n) => n.as_i64(),
                    serde_json::Value::String(s) => s.parse::<i64>().ok(),
                    _ => None,
                };
                key.map(|k| (k, e.name.clone()))
            })
            .collect()
    });

    let enum_mask = enum_values.as_ref().map(|values| {
        let max_key = values.keys().copied().max().unwrap_or(0);
        let bits = 64 - (max_key.max(0) as u64).leading_zeros().min(64);
        (1i64 << bits) - 1
    });

    FieldDescriptor {
        name,
        long_name,
        bit_offset: raw.bit_offset,
        bit_length,
        bit_length_variable: raw.bit_length_variable || raw.bit_length == Some(-1),
        signed: raw.signed,
        field_type: raw.field_type.unwrap_or_else(|| "scalar".to_string()),
        resolution: raw.resolution.unwrap_or(1.0),
        units: raw.units,
        enum_values,
        enum_mask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "PGNs": [
            {
                "PGN": 128267,
                "Description": "Water Depth",
                "Length": 8,
                "Fields": [
                    { "Name": "SID", "BitOffset": 0, "BitLength": 8 },
                    { "Name": "Depth", "BitOffset": 8, "BitLength": 32, "Resolution": 0.01, "Units": "m" },
                    { "Name": "Offset", "BitOffset": 40, "BitLength": 16, "Signed": true, "Resolution": 0.001, "Units": "m" }
                ]
            },
            {
                "PGN": 130306,
                "Description": "Wind Data",
                "Length": 8,
                "Fields": [
                    { "Name": "Reference", "BitOffset": 42, "BitLength": 3, "Type": "Lookup table",
                      "EnumValues": [ {"value": 0, "name": "True (ground referenced to North)"}, {"value": 2, "name": "Apparent"} ] }
                ]
            }
        ]
    }
    "#;

    #[test]
    fn loads_and_indexes_by_pgn() {
        let catalog = Catalog::load_from_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(128267));
        assert!(!catalog.contains(999999));
    }

    #[test]
    fn strips_spaces_for_canonical_name_keeps_long_name() {
        let catalog = Catalog::load_from_str(SAMPLE).unwrap();
        let pgn = catalog.get(128267).unwrap();
        let depth = pgn.fields.iter().find(|f| f.name.as_deref() == Some("Depth")).unwrap();
        assert_eq!(depth.long_name, "Depth");
    }

    #[test]
    fn reserved_and_sid_fields_are_not_emitted() {
        let catalog = Catalog::load_from_str(SAMPLE).unwrap();
        let pgn = catalog.get(128267).unwrap();
        let sid = pgn.fields.iter().find(|f| f.name.as_deref() == Some("SID")).unwrap();
        assert!(!sid.is_emitted());
    }

    #[test]
    fn enum_mask_computed_from_max_key() {
        let catalog = Catalog::load_from_str(SAMPLE).unwrap();
        let pgn = catalog.get(130306).unwrap();
        let reference = pgn.fields.iter().find(|f| f.name.as_deref() == Some("Reference")).unwrap();
        // max key 2 -> 2 bits -> mask 3
        assert_eq!(reference.enum_mask, Some(3));
        assert_eq!(reference.enum_values.as_ref().unwrap().get(&2).unwrap(), "Apparent");
    }

    #[test]
    fn missing_pgns_key_is_fatal() {
        let err = Catalog::load_from_str("{}").unwrap_err();
        assert!(matches!(err, CatalogError::MissingPgns));
    }

    #[test]
    fn known_correction_is_not_applied_unless_requested() {
        let mut catalog = Catalog::load_from_str(SAMPLE).unwrap();
        let before = catalog.get(130306).unwrap().fields[0].bit_offset;
        assert_eq!(before, Some(42));
        catalog.apply_known_corrections();
        let after = catalog.get(130306).unwrap().fields[0].bit_offset;
        assert_eq!(after, Some(45));
    }
}
