//! Consumer fan-out.
//!
//! Every decoded record is handed to an ordered list of consumers. A
//! consumer that returns an error has that error logged and is skipped for
//! this record; it stays registered and gets the next one. There is no
//! `catch_unwind` here: a consumer is expected to report failure through
//! its `Result`, not panic.

use tracing::warn;

use crate::catalog::PgnDescriptor;
use crate::error::ConsumerError;
use crate::record::DecodedRecord;

/// Something that wants to see every decoded PGN record.
pub trait Consumer {
    fn consume(&mut self, pgn: u32, record: &DecodedRecord, descriptor: &PgnDescriptor) -> Result<(), ConsumerError>;
}

/// Dispatches one record to each registered consumer in order, continuing
/// past individual failures.
#[derive(Default)]
pub struct Fanout {
    consumers: Vec<Box<dyn Consumer + Send>>,
}

impl Fanout {
    pub fn new() -> Self {
        Fanout::default()
    }

    pub fn register(&mut self, consumer: Box<dyn Consumer + Send>) {
        self.consumers.push(consumer);
    }

    pub fn dispatch(&mut self, pgn: u32, record: &DecodedRecord, descriptor: &PgnDescriptor) {
        for consumer in &mut self.consumers {
            if let Err(e) = consumer.consume(pgn, record, descriptor) {
                warn!(pgn, error = %e, "consumer failed to process record");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}
