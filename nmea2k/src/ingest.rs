//! End-to-end frame ingestion: wires the reassembler, decoder and fan-out
//! into the single entry point a transport (live CAN socket or log replay)
//! calls for every frame it reads.

use crate::arbitration::ArbitrationId;
use crate::catalog::Catalog;
use crate::consumer::Fanout;
use crate::decoder;
use crate::reassembler::Reassembler;

/// Owns the per-source reassembly state and drives one frame at a time
/// through decode and fan-out dispatch.
pub struct Ingest<'a> {
    catalog: &'a Catalog,
    reassembler: Reassembler,
    fanout: Fanout,
}

impl<'a> Ingest<'a> {
    pub fn new(catalog: &'a Catalog, fanout: Fanout) -> Self {
        Ingest {
            catalog,
            reassembler: Reassembler::new(),
            fanout,
        }
    }

    /// Feed one CAN frame (raw 29-bit identifier plus data bytes) through
    /// reassembly, decoding and dispatch. Frames for PGNs the catalog
    /// doesn't know, or still in the middle of a Fast Packet sequence,
    /// produce no output.
    pub fn handle_frame(&mut self, raw_id: u32, data: &[u8]) {
        let arbitration_id = ArbitrationId::from_raw(raw_id);

        let Some(payload) = self.reassembler.process_frame(arbitration_id.pgn, arbitration_id.source_address, data, self.catalog)
        else {
            return;
        };

        let Some(record) = decoder::decode(&arbitration_id, &payload, self.catalog) else {
            return;
        };

        let Some(descriptor) = self.catalog.get(arbitration_id.pgn) else {
            return;
        };

        self.fanout.dispatch(arbitration_id.pgn, &record, descriptor);
    }

    pub fn fanout_mut(&mut self) -> &mut Fanout {
        &mut self.fanout
    }
}
