//! JSON-per-line producer, fed to the `json` broadcast server.
//!
//! Every decoded record is reformatted into a canboat-analyzer-shaped JSON
//! object and appended to a buffer; the buffer is flushed and cleared each
//! time the owning [`crate::broadcast::BroadcastServer`] calls `produce()`.

use std::sync::Mutex;

use chrono::Local;
use nmea2k::{Consumer, ConsumerError, DecodedRecord, Destination, FieldValue, PgnDescriptor};
use serde_json::{json, Map, Value};

pub struct JsonStream {
    buffer: Mutex<Vec<String>>,
}

impl JsonStream {
    pub fn new() -> Self {
        JsonStream { buffer: Mutex::new(Vec::new()) }
    }

    /// Called by the broadcast server on its timer; drains and joins the
    /// buffer into one newline-delimited payload.
    pub fn produce(&self) -> Vec<u8> {
        let mut buffer = self.buffer.lock().unwrap();
        if buffer.is_empty() {
            return Vec::new();
        }
        let mut output = buffer.join("\n");
        output.push('\n');
        buffer.clear();
        output.into_bytes()
    }
}

impl Default for JsonStream {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonStream {
    /// Format and buffer one decoded record. Takes `&self` (the buffer is
    /// mutex-guarded) so callers holding an `Arc<JsonStream>` — the
    /// broadcast server's producer closure, in particular — don't need
    /// exclusive access.
    pub fn record(&self, pgn: u32, record: &DecodedRecord, descriptor: &PgnDescriptor) -> Result<(), ConsumerError> {
        let mut fields = Map::new();
        for field in record.iter() {
            let value = match (&field.value, field.units.as_str()) {
                (FieldValue::Unknown, _) => Value::String("Unknown".to_string()),
                (FieldValue::Number(n), "rad") | (FieldValue::Number(n), "rad/s") => {
                    Value::String(format!("{:.2}", n.to_degrees()))
                }
                (FieldValue::Number(n), _) => json!(n),
                (FieldValue::Text(t), _) => Value::String(t.clone()),
            };
            fields.insert(field.long_name.clone(), value);
        }

        let dst: u8 = match record.destination {
            Destination::Broadcast => 255,
            Destination::Address(addr) => addr,
        };

        let object = json!({
            "timestamp": Local::now().format("%Y-%m-%d-%H:%M:%S.%3f").to_string(),
            "prio": record.priority,
            "src": record.source_address,
            "dst": dst,
            "pgn": pgn,
            "description": descriptor.description,
            "Fields": fields,
        });

        self.buffer
            .lock()
            .unwrap()
            .push(serde_json::to_string(&object).map_err(|e| ConsumerError(e.to_string()))?);

        Ok(())
    }
}

impl Consumer for JsonStream {
    fn consume(&mut self, pgn: u32, record: &DecodedRecord, descriptor: &PgnDescriptor) -> Result<(), ConsumerError> {
        self.record(pgn, record, descriptor)
    }
}
