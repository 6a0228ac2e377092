//! Stdout debug printer.
//!
//! One line per decoded record, `rad`/`rad/s` fields rendered in degrees
//! because nobody can think in radians, unknown fields shown as `Unknown`.

use nmea2k::{Consumer, ConsumerError, DecodedRecord, FieldValue, PgnDescriptor};

pub struct PgnPrinter;

impl Consumer for PgnPrinter {
    fn consume(&mut self, pgn: u32, record: &DecodedRecord, descriptor: &PgnDescriptor) -> Result<(), ConsumerError> {
        let fields: Vec<String> = record.iter().map(render_field).collect();
        println!(
            "source={}: pgn={}({}): values={}",
            record.source_address,
            descriptor.description,
            pgn,
            fields.join(" ")
        );
        Ok(())
    }
}

fn render_field(field: &nmea2k::record::DecodedField) -> String {
    let (value, units) = match (&field.value, field.units.as_str()) {
        (FieldValue::Unknown, _) => ("Unknown".to_string(), String::new()),
        (FieldValue::Number(n), "rad") => (format!("{:.2}", n.to_degrees()), "deg".to_string()),
        (FieldValue::Number(n), "rad/s") => (format!("{:.2}", n.to_degrees()), "deg/s".to_string()),
        (FieldValue::Number(n), units) => (n.to_string(), units.to_string()),
        (FieldValue::Text(t), units) => (t.clone(), units.to_string()),
    };

    if units.is_empty() {
        format!("{}=({})", field.name, value)
    } else {
        format!("{}=({} {})", field.name, value, units)
    }
}
