//! NMEA2000 protocol core: J1939 identifiers, the PGN catalog, bit-level
//! decoding, Fast Packet reassembly, consumer fan-out and the state cache.
//!
//! This crate has no knowledge of CAN hardware, TCP servers or log files;
//! those live in the `nmea_router` binary that depends on it.

pub mod arbitration;
pub mod bitfield;
pub mod cache;
pub mod catalog;
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod ingest;
pub mod reassembler;
pub mod record;

pub use arbitration::{ArbitrationId, Destination};
pub use cache::StateCache;
pub use catalog::{Catalog, FieldDescriptor, PgnDescriptor};
pub use consumer::{Consumer, Fanout};
pub use decoder::decode;
pub use error::{CatalogError, ConsumerError, ExtractError};
pub use ingest::Ingest;
pub use reassembler::Reassembler;
pub use record::{DecodedRecord, FieldValue};
