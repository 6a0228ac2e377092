//! Fast Packet multi-frame reassembly.
//!
//! PGNs whose catalog length exceeds a single CAN frame's 8 data bytes are
//! split across frames using the Fast Packet header: the first payload byte
//! packs a 3-bit sequence counter (top bits) and a 5-bit frame counter (low
//! bits), and the first frame of a sequence carries a total-length byte
//! before any real data. Everything else passes straight through unmodified.
//!
//! Reassembly state is kept per source address; a sequence that doesn't
//! match what's in flight for that address silently discards whatever was
//! buffered and starts over — there is no way to recover a torn
//! transmission. Only the sequence counter and PGN are compared against
//! what's in flight; the frame counter never is, so appending never
//! fails on it.

use std::collections::HashMap;

use crate::catalog::Catalog;

struct ReassemblyContext {
    pgn: u32,
    sequence: u8,
    packets_left: usize,
    total_length: usize,
    buffer: Vec<u8>,
}

/// Per-source fast-packet state machine.
#[derive(Default)]
pub struct Reassembler {
    contexts: HashMap<u8, ReassemblyContext>,
}

impl Reassembler {
    pub fn new() -> Self {
        Reassembler::default()
    }

    /// Feed one CAN frame's data bytes. Returns the complete payload once a
    /// PGN instance has been fully reassembled (or immediately, for PGNs that
    /// fit in a single frame).
    pub fn process_frame(&mut self, pgn: u32, source_address: u8, data: &[u8], catalog: &Catalog) -> Option<Vec<u8>> {
        if data.is_empty() {
            return None;
        }

        let sequence = data[0] >> 5;

        if let Some(ctx) = self.contexts.get(&source_address) {
            if ctx.sequence != sequence || ctx.pgn != pgn {
                // Lost sequence: silent, local recovery.
                self.contexts.remove(&source_address);
                return None;
            }

            let ctx = self.contexts.get_mut(&source_address).unwrap();
            ctx.buffer.extend_from_slice(&data[1..]);
            ctx.packets_left = ctx.packets_left.saturating_sub(1);

            if ctx.packets_left == 0 {
                let mut ctx = self.contexts.remove(&source_address).unwrap();
                ctx.buffer.truncate(ctx.total_length);
                return Some(ctx.buffer);
            }
            return None;
        }

        // Idle: a frame with no length byte can't start a Fast Packet
        // sequence, so it falls through as a short/single-frame PGN.
        let declared_length = data.get(1).copied().unwrap_or(0) as usize;
        let catalog_is_fast_packet = catalog.get(pgn).is_some_and(|d| d.length > 8);

        if catalog_is_fast_packet && declared_length > 6 && data.len() >= 2 {
            let extra = declared_length - 6;
            let packets_left = extra.div_ceil(7);
            let mut buffer = Vec::with_capacity(declared_length);
            buffer.extend_from_slice(&data[2..]);
            self.contexts.insert(
                source_address,
                ReassemblyContext {
                    pgn,
                    sequence,
                    packets_left,
                    total_length: declared_length,
                    buffer,
                },
            );
            None
        } else {
            Some(data.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with_fast_packet_pgn() -> Catalog {
        Catalog::load_from_str(
            r#"{"PGNs": [
                {"PGN": 129029, "Description": "GNSS Position Data", "Length": 43, "Fields": []},
                {"PGN": 128267, "Description": "Water Depth", "Length": 8, "Fields": []}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn single_frame_pgn_passes_through_unmodified() {
        let catalog = catalog_with_fast_packet_pgn();
        let mut r = Reassembler::new();
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let result = r.process_frame(128267, 5, &data, &catalog).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn fast_packet_catalog_pgn_with_short_declared_length_passes_through() {
        // Catalog says 129029 is Fast Packet capable, but this particular
        // frame declares only 4 bytes -- the "idle, otherwise" branch, not a
        // sequence start.
        let catalog = catalog_with_fast_packet_pgn();
        let mut r = Reassembler::new();
        let data = [0b000_00000, 4, 1, 2, 3, 4, 5, 6];
        let result = r.process_frame(129029, 9, &data, &catalog).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn multi_frame_pgn_reassembles_across_frames() {
        let catalog = catalog_with_fast_packet_pgn();
        let mut r = Reassembler::new();

        // sequence 0, frame 0, total length 14, 6 payload bytes.
        let first = [0b000_00000, 14, 1, 2, 3, 4, 5, 6];
        assert!(r.process_frame(129029, 9, &first, &catalog).is_none());

        // sequence 0, frame 1, 7 more payload bytes -> 13 total, still short.
        let second = [0b000_00001, 7, 8, 9, 10, 11, 12, 13];
        assert!(r.process_frame(129029, 9, &second, &catalog).is_none());

        // sequence 0, frame 2, final byte.
        let third = [0b000_00010, 14, 0, 0, 0, 0, 0, 0];
        let result = r.process_frame(129029, 9, &third, &catalog);
        assert_eq!(result.unwrap().len(), 14);
    }

    #[test]
    fn reassembles_two_frame_wind_sequence() {
        // Two frames, sequence 0, total length 12.
        let catalog = Catalog::load_from_str(
            r#"{"PGNs": [{"PGN": 130306, "Description": "Wind Data", "Length": 12, "Fields": []}]}"#,
        )
        .unwrap();
        let mut r = Reassembler::new();

        let a = [0x00, 0x0c, 0xff, 0xe4, 0x0e, 0xe8, 0x03, 0xfa];
        assert!(r.process_frame(130306, 1, &a, &catalog).is_none());

        let b = [0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        let payload = r.process_frame(130306, 1, &b, &catalog).unwrap();
        assert_eq!(payload, vec![0xff, 0xe4, 0x0e, 0xe8, 0x03, 0xfa, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn sequence_mismatch_aborts_and_resets() {
        let catalog = catalog_with_fast_packet_pgn();
        let mut r = Reassembler::new();
        let first = [0b000_00000, 14, 1, 2, 3, 4, 5, 6];
        r.process_frame(129029, 9, &first, &catalog);

        // sequence counter 1 instead of the in-flight 0 -> dropped silently,
        // even though the PGN matches.
        let bad = [0b001_00001, 7, 8, 9, 10, 11, 12, 13];
        assert!(r.process_frame(129029, 9, &bad, &catalog).is_none());
        assert!(r.contexts.is_empty());

        // a fresh, well-formed sequence from the same source decodes normally.
        let restart = [0b010_00000, 14, 1, 2, 3, 4, 5, 6];
        assert!(r.process_frame(129029, 9, &restart, &catalog).is_none());
        assert!(!r.contexts.is_empty());
    }

    #[test]
    fn pgn_mismatch_mid_sequence_aborts() {
        let catalog = catalog_with_fast_packet_pgn();
        let mut r = Reassembler::new();
        let first = [0b000_00000, 14, 1, 2, 3, 4, 5, 6];
        r.process_frame(129029, 9, &first, &catalog);

        // same sequence counter, but a different PGN from the same source.
        let other_pgn = [0b000_00001, 7, 8, 9, 10, 11, 12, 13];
        assert!(r.process_frame(999, 9, &other_pgn, &catalog).is_none());
        assert!(r.contexts.is_empty());
    }
}
