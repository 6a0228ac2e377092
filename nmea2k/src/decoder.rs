//! Schema-driven PGN decoding.
//!
//! Walks a PGN's field list in catalog order, pulling each field out of the
//! reassembled payload with [`crate::bitfield::extract`] and applying
//! resolution scaling, enum lookup and the "not available" sentinel rule.
//! `Reserved`/`SID`/unnamed fields are still extracted (to keep the bit
//! cursor correct for whatever follows) but never appear in the output.

use tracing::warn;

use crate::arbitration::ArbitrationId;
use crate::bitfield::{self, ExtractedValue};
use crate::catalog::{Catalog, FieldDescriptor, PgnDescriptor};
use crate::record::{DecodedField, DecodedRecord, FieldValue};

/// Decode one reassembled PGN payload into a [`DecodedRecord`].
///
/// Returns `None` when the PGN isn't in the catalog at all (nothing to
/// decode against); a field whose extractor is unimplemented is skipped
/// with a warning rather than aborting the whole record, since one bad
/// field shouldn't hide the rest of a useful message.
pub fn decode(arbitration_id: &ArbitrationId, payload: &[u8], catalog: &Catalog) -> Option<DecodedRecord> {
    let descriptor = catalog.get(arbitration_id.pgn)?;
    Some(decode_with_descriptor(descriptor, arbitration_id, payload))
}

fn decode_with_descriptor(descriptor: &PgnDescriptor, arbitration_id: &ArbitrationId, payload: &[u8]) -> DecodedRecord {
    let mut record = DecodedRecord::new(
        descriptor.pgn,
        arbitration_id.priority,
        arbitration_id.source_address,
        arbitration_id.destination(),
    );

    // Rolling cursor for BitLengthVariable fields, which pick up right where
    // the previous field's declared span left off.
    let mut cursor_offset: i64 = 0;
    let mut cursor_length: i64 = 0;

    for field in &descriptor.fields {
        let bit_offset;
        let bit_length;
        if let (Some(offset), Some(length)) = (field.bit_offset, field.bit_length) {
            cursor_offset = offset;
            cursor_length = length;
            bit_offset = offset;
            bit_length = Some(length);
        } else if field.bit_length_variable {
            cursor_offset += cursor_length;
            cursor_length = 0;
            bit_offset = cursor_offset;
            bit_length = None;
        } else if let Some(offset) = field.bit_offset {
            bit_offset = offset;
            bit_length = field.bit_length;
        } else {
            continue;
        }

        let Some(bit_length) = bit_length else {
            warn!(pgn = descriptor.pgn, field = field.long_name, "variable-length field has no decoder, skipping");
            continue;
        };

        let Some(decoded) = decode_field(field, payload, bit_offset as usize, bit_length as usize, descriptor.pgn) else {
            continue;
        };

        if field.is_emitted() {
            if let Some(name) = &field.name {
                record.push(DecodedField {
                    name: name.clone(),
                    long_name: field.long_name.clone(),
                    value: decoded.value,
                    raw_value: decoded.raw_value,
                    units: decoded.units,
                });
            }
        }
    }

    record
}

struct Decoded {
    value: FieldValue,
    raw_value: f64,
    units: String,
}

fn decode_field(field: &FieldDescriptor, payload: &[u8], bit_offset: usize, bit_length: usize, pgn: u32) -> Option<Decoded> {
    let extracted = match bitfield::extract(payload, bit_offset, bit_length, &field.field_type, field.signed) {
        Ok(v) => v,
        Err(e) => {
            warn!(pgn, field = field.long_name, error = %e, "field extraction failed, skipping");
            return None;
        }
    };

    Some(match extracted {
        ExtractedValue::Text(s) => Decoded {
            value: FieldValue::Text(s),
            raw_value: 0.0,
            units: field.units.clone().unwrap_or_default(),
        },
        ExtractedValue::Integer(raw) => resolve_integer(field, bit_length, raw),
    })
}

fn resolve_integer(field: &FieldDescriptor, bit_length: usize, raw: i64) -> Decoded {
    if is_unknown_sentinel(raw, bit_length, field.signed) {
        return Decoded {
            value: FieldValue::Unknown,
            raw_value: raw as f64,
            units: String::new(),
        };
    }

    if let Some(enum_values) = &field.enum_values {
        let masked = match field.enum_mask {
            Some(mask) => raw & mask,
            None => raw,
        };
        let value = match enum_values.get(&masked) {
            Some(name) => FieldValue::Text(name.clone()),
            None => FieldValue::Text(masked.to_string()),
        };
        return Decoded {
            value,
            raw_value: masked as f64,
            units: field.units.clone().unwrap_or_default(),
        };
    }

    let scaled = raw as f64 * field.resolution;
    Decoded {
        value: FieldValue::Number(scaled),
        raw_value: scaled,
        units: field.units.clone().unwrap_or_default(),
    }
}

/// The catalog's "value not available" convention: all raw bits set to one
/// for an unsigned field; for a signed field the same all-ones pattern with
/// the sign bit shifted off, since the sign bit itself carries no magnitude.
/// Checked before any resolution scaling is applied.
fn is_unknown_sentinel(raw: i64, bit_length: usize, signed: bool) -> bool {
    if bit_length == 0 || bit_length > 63 {
        return false;
    }
    let all_ones = (1i64 << bit_length) - 1;
    let unsigned_pattern = raw & all_ones;
    let sentinel = if signed { all_ones >> 1 } else { all_ones };
    unsigned_pattern == sentinel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::ArbitrationId;

    fn depth_catalog() -> Catalog {
        Catalog::load_from_str(
            r#"{"PGNs": [
                {"PGN": 128267, "Description": "Water Depth", "Length": 8, "Fields": [
                    {"Name": "SID", "BitOffset": 0, "BitLength": 8},
                    {"Name": "Depth", "BitOffset": 8, "BitLength": 32, "Resolution": 0.01, "Units": "m"},
                    {"Name": "Offset", "BitOffset": 40, "BitLength": 16, "Signed": true, "Resolution": 0.001, "Units": "m"}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    fn arb_id_for(pgn: u32) -> u32 {
        let dp = (pgn >> 16) & 0x1;
        let pf = (pgn >> 8) & 0xff;
        let ps = pgn & 0xff;
        (3u32 << 26) | (dp << 24) | (pf << 16) | (ps << 8) | 7
    }

    #[test]
    fn decodes_scaled_fields_and_skips_sid() {
        let catalog = depth_catalog();
        // SID=1, Depth=500 (raw) -> 5.00m, Offset=-100 (raw) -> -0.1m
        let payload: [u8; 8] = [1, 0xf4, 0x01, 0, 0, 0x9c, 0xff, 0];
        let record = decode(&ArbitrationId::from_raw(arb_id_for(128267)), &payload, &catalog).unwrap();
        assert_eq!(record.get("SID"), None);
        assert_eq!(record.get("Depth"), Some(&FieldValue::Number(5.0)));
        assert_eq!(record.get("Offset"), Some(&FieldValue::Number(-0.1)));
        assert_eq!(record.source_address, 7);
        assert_eq!(record.priority, 3);
    }

    #[test]
    fn unknown_sentinel_detected_before_scaling() {
        let catalog = depth_catalog();
        let payload: [u8; 8] = [0, 0xff, 0xff, 0xff, 0xff, 0, 0, 0];
        let record = decode(&ArbitrationId::from_raw(arb_id_for(128267)), &payload, &catalog).unwrap();
        assert_eq!(record.get("Depth"), Some(&FieldValue::Unknown));
        let field = record.get_field("Depth").unwrap();
        assert_eq!(field.raw_value, 0xffffffffu32 as f64);
    }

    #[test]
    fn signed_field_unknown_sentinel_is_all_ones_minus_sign_bit() {
        let catalog = depth_catalog();
        // Offset is a 16-bit signed field; its "not available" sentinel is
        // 0x7fff (all ones with the sign bit shifted off), not 0xffff.
        let payload: [u8; 8] = [0, 0, 0, 0, 0, 0xff, 0x7f, 0];
        let record = decode(&ArbitrationId::from_raw(arb_id_for(128267)), &payload, &catalog).unwrap();
        assert_eq!(record.get("Offset"), Some(&FieldValue::Unknown));
    }

    #[test]
    fn signed_field_all_ones_bit_pattern_is_not_unknown() {
        let catalog = depth_catalog();
        // Offset = 0xffff (raw -1) is a legitimate signed value, not the
        // sentinel, since the sentinel is 0x7fff once the sign bit is shifted off.
        let payload: [u8; 8] = [0, 0, 0, 0, 0, 0xff, 0xff, 0];
        let record = decode(&ArbitrationId::from_raw(arb_id_for(128267)), &payload, &catalog).unwrap();
        assert_eq!(record.get("Offset"), Some(&FieldValue::Number(-0.001)));
    }

    #[test]
    fn unknown_pgn_returns_none() {
        let catalog = depth_catalog();
        let payload = [0u8; 8];
        assert!(decode(&ArbitrationId::from_raw(arb_id_for(999999)), &payload, &catalog).is_none());
    }

    #[test]
    fn enum_field_resolves_to_text() {
        let catalog = Catalog::load_from_str(
            r#"{"PGNs": [
                {"PGN": 130306, "Description": "Wind Data", "Length": 8, "Fields": [
                    {"Name": "Reference", "BitOffset": 40, "BitLength": 3, "Type": "Lookup table",
                     "EnumValues": [{"value": 0, "name": "True"}, {"value": 2, "name": "Apparent"}]}
                ]}
            ]}"#,
        )
        .unwrap();
        let mut payload = [0u8; 8];
        payload[5] = 2;
        let record = decode(&ArbitrationId::from_raw(arb_id_for(130306)), &payload, &catalog).unwrap();
        assert_eq!(record.get("Reference"), Some(&FieldValue::Text("Apparent".to_string())));
    }

    #[test]
    fn variable_length_field_is_skipped_with_cursor_preserved() {
        let catalog = Catalog::load_from_str(
            r#"{"PGNs": [
                {"PGN": 999, "Description": "Synthetic", "Length": 8, "Fields": [
                    {"Name": "Fixed", "BitOffset": 0, "BitLength": 8},
                    {"Name": "Variable", "BitLengthVariable": true, "Type": "ASCII text"},
                    {"Name": "Tail", "BitOffset": 16, "BitLength": 8}
                ]}
            ]}"#,
        )
        .unwrap();
        let payload = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let record = decode(&ArbitrationId::from_raw(arb_id_for(999)), &payload, &catalog).unwrap();
        assert_eq!(record.get("Fixed"), Some(&FieldValue::Number(1.0)));
        assert_eq!(record.get("Variable"), None);
        assert_eq!(record.get("Tail"), Some(&FieldValue::Number(3.0)));
    }
}
