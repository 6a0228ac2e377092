//! The decoded output shape.
//!
//! A decoded PGN carries four `nmea2000:*` metadata values (pgn, priority,
//! source address, destination) plus an ordered list of fields. Field counts
//! are small and catalog order matters to anything printing or logging a
//! record, so fields live in an insertion-ordered `Vec` rather than a map.

use crate::arbitration::Destination;

/// One decoded field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    /// Present but equal to the catalog's "not available" sentinel.
    Unknown,
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldValue::Unknown)
    }
}

/// A single decoded field, carrying the value, raw value, units and long
/// name as one unit rather than four synthesized string keys.
#[derive(Debug, Clone)]
pub struct DecodedField {
    pub name: String,
    pub long_name: String,
    pub value: FieldValue,
    /// Pre-scaling raw value when unknown; the scaled value otherwise.
    pub raw_value: f64,
    pub units: String,
}

/// A fully decoded PGN instance.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub pgn: u32,
    pub priority: u8,
    pub source_address: u8,
    pub destination: Destination,
    fields: Vec<DecodedField>,
}

impl DecodedRecord {
    pub fn new(pgn: u32, priority: u8, source_address: u8, destination: Destination) -> Self {
        DecodedRecord {
            pgn,
            priority,
            source_address,
            destination,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, field: DecodedField) {
        self.fields.push(field);
    }

    /// Linear-scan lookup; field counts per PGN are small enough that this
    /// beats carrying a second index structure alongside the `Vec`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn get_field(&self, name: &str) -> Option<&DecodedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecodedField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
