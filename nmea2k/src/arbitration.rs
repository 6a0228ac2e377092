//! J1939 29-bit CAN identifier decomposition.
//!
//! NMEA 2000 frames are carried as J1939 extended (29-bit) CAN identifiers.
//! The identifier packs priority, PGN and addressing; PDU1 (peer-to-peer)
//! and PDU2 (broadcast) formats disagree about whether the low-order PGN
//! byte is part of the PGN or a destination address.

/// A parsed 29-bit CAN identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrationId {
    pub priority: u8,
    pub pgn: u32,
    pub source_address: u8,
    destination_address: u8,
    broadcast: bool,
}

/// The destination of a frame: a specific node, or everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Address(u8),
    Broadcast,
}

impl ArbitrationId {
    /// Decode a 29-bit extended CAN identifier per the J1939 PDU1/PDU2 split.
    pub fn from_raw(id: u32) -> Self {
        let source_address = (id & 0xff) as u8;
        let ps = ((id >> 8) & 0xff) as u8;
        let pf = ((id >> 16) & 0xff) as u8;
        let dp = ((id >> 24) & 0x1) as u32;
        let priority = ((id >> 26) & 0x7) as u8;

        if pf >= 240 {
            // PDU2: the whole PS byte folds into the PGN, destination is everyone.
            let pgn = (dp << 16) | ((pf as u32) << 8) | (ps as u32);
            ArbitrationId {
                priority,
                pgn,
                source_address,
                destination_address: 0xff,
                broadcast: true,
            }
        } else {
            // PDU1: PS is a specific destination address, not part of the PGN.
            let pgn = (dp << 16) | ((pf as u32) << 8);
            ArbitrationId {
                priority,
                pgn,
                source_address,
                destination_address: ps,
                broadcast: false,
            }
        }
    }

    pub fn destination(&self) -> Destination {
        if self.broadcast {
            Destination::Broadcast
        } else {
            Destination::Address(self.destination_address)
        }
    }

    /// Raw destination byte for metadata purposes
    /// (`nmea2000:destination_address`); 0xff for broadcast.
    pub fn destination_address_raw(&self) -> u8 {
        self.destination_address
    }
}
