//! Bit-level field extraction.
//!
//! The PGN catalog expresses every field as a bit range, not a byte-aligned
//! struct offset, so decoding a PGN means pulling a little-endian integer or
//! ASCII slice out of an arbitrary bit span. This module is the single place
//! that does that; the decoder stays purely schema-driven.

use crate::error::ExtractError;

/// The decoded value of one field, before resolution scaling is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedValue {
    /// Sign-extended to i64 when the field is signed; zero-extended otherwise
    /// (as an i64 wide enough to hold any unsigned value up to 64 bits tried here).
    Integer(i64),
    Text(String),
}

impl ExtractedValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            ExtractedValue::Integer(v) => *v,
            ExtractedValue::Text(_) => 0,
        }
    }
}

/// Extract one field from `bytes`.
///
/// `type_name` is the catalog's `Type` string (absent fields behave as
/// `"scalar"` at the call site in the decoder).
pub fn extract(
    bytes: &[u8],
    bit_offset: usize,
    bit_length: usize,
    type_name: &str,
    signed: bool,
) -> Result<ExtractedValue, ExtractError> {
    // Short-frame tolerance: a field that doesn't fit in the data we have
    // decodes as zero rather than erroring.
    if bit_offset + bit_length > bytes.len() * 8 {
        return Ok(ExtractedValue::Integer(0));
    }

    let starting_byte = bit_offset / 8;
    let num_bytes = bit_length.div_ceil(8);

    if type_name == "ASCII text" {
        let slice = &bytes[starting_byte..(starting_byte + num_bytes).min(bytes.len())];
        let text: String = slice.iter().filter(|&&b| b.is_ascii()).map(|&b| b as char).collect();
        return Ok(ExtractedValue::Text(text));
    }

    if type_name == "ASCII string starting with length byte" {
        return Err(ExtractError::Unimplemented {
            type_name: type_name.to_string(),
        });
    }

    let data = &bytes[starting_byte..starting_byte + num_bytes];
    let raw: i64 = match num_bytes {
        1 if signed => data[0] as i8 as i64,
        1 => data[0] as i64,
        2 if signed => i16::from_le_bytes([data[0], data[1]]) as i64,
        2 => u16::from_le_bytes([data[0], data[1]]) as i64,
        3 => {
            // Zero-pad three-byte values to four before decoding.
            let padded = [data[0], data[1], data[2], 0];
            if signed {
                // Sign-extend from bit 23, not bit 31, of the padded word.
                let unsigned = u32::from_le_bytes(padded);
                let shifted = (unsigned << 8) as i32 >> 8;
                shifted as i64
            } else {
                u32::from_le_bytes(padded) as i64
            }
        }
        4 if signed => i32::from_le_bytes([data[0], data[1], data[2], data[3]]) as i64,
        4 => u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as i64,
        8 if signed => i64::from_le_bytes(data.try_into().unwrap()),
        8 => u64::from_le_bytes(data.try_into().unwrap()) as i64,
        other => return Err(ExtractError::UnsupportedWidth { num_bytes: other }),
    };

    let mut value = raw;
    let bit_offset_in_byte = bit_offset % 8;
    if bit_offset_in_byte != 0 || bit_length % 8 != 0 {
        value >>= bit_offset_in_byte;
        if bit_length % 8 != 0 {
            value &= (1i64 << bit_length) - 1;
        }
    }

    Ok(ExtractedValue::Integer(value))
}
