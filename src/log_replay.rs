//! Text log replay.
//!
//! Each non-blank line is one CAN frame in one of two formats —
//!
//! - Raymarine Lighthouse II: `Rx 478700 09 f5 03 05 f8 00 00 ff ff ff ff ff`
//!   (`Rx`/`Tx`, an ignored sequence number, four hex words that concatenate
//!   into the 29-bit identifier, then the data bytes)
//! - candump: `vcan0 09F50305 [8] F8 00 00 FF FF FF FF FF` (interface,
//!   identifier, ignored length marker, then the data bytes)
//!
//! Lines that don't parse are logged and skipped rather than aborting the
//! whole replay — a truncated or corrupted log file is common enough in
//! practice that one bad line shouldn't lose the rest.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nmea2k::{ArbitrationId, Ingest};
use tracing::warn;

use crate::config::SourceFilterConfig;

/// Whether a frame's PGN/source passes the configured allow-list, applied
/// identically to live CAN traffic and log replay so a filtered PGN never
/// even reaches the reassembler.
pub fn frame_is_accepted(filter: &SourceFilterConfig, raw_id: u32) -> bool {
    let arbitration_id = ArbitrationId::from_raw(raw_id);
    filter.should_accept(arbitration_id.pgn, arbitration_id.source_address)
}

/// Parse one log line into a raw 29-bit identifier and data bytes.
pub fn parse_line(line: &str) -> Option<(u32, Vec<u8>)> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    if words[0] == "Rx" || words[0] == "Tx" {
        if words.len() < 6 {
            return None;
        }
        let identifier = u32::from_str_radix(&words[2..6].concat(), 16).ok()?;
        let data = hex_to_bytes(&words[6..].concat())?;
        Some((identifier, data))
    } else {
        if words.len() < 3 {
            return None;
        }
        let identifier = u32::from_str_radix(words[1], 16).ok()?;
        let data = hex_to_bytes(&words[3..].concat())?;
        Some((identifier, data))
    }
}

fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Replay every frame in `path` through `ingest`, in file order, dropping
/// whatever `filter` rejects before it reaches the reassembler.
pub fn replay_file<P: AsRef<Path>>(path: P, ingest: &mut Ingest, filter: &SourceFilterConfig) -> std::io::Result<()> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_line(trimmed) {
            Some((identifier, data)) if frame_is_accepted(filter, identifier) => {
                ingest.handle_frame(identifier, &data)
            }
            Some(_) => {}
            None => warn!(line = trimmed, "skipping unparseable log line"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raymarine_lighthouse_format() {
        let line = "Rx 478700 09 f5 03 05 f8 00 00 ff ff ff ff ff";
        let (identifier, data) = parse_line(line).unwrap();
        assert_eq!(identifier, 0x09f50305);
        assert_eq!(data, vec![0xf8, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn parses_candump_format() {
        let line = "vcan0 09F50305 [8] F8 00 00 FF FF FF FF FF";
        let (identifier, data) = parse_line(line).unwrap();
        assert_eq!(identifier, 0x09f50305);
        assert_eq!(data, vec![0xf8, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn rejects_truncated_lines() {
        assert!(parse_line("Rx 478700 09 f5").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn rejects_odd_length_hex() {
        assert!(parse_line("Rx 478700 09 f5 03 05 f").is_none());
    }
}
