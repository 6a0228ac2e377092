//! NMEA 0183 sentence producer.
//!
//! Three fixed sentence templates read off the [`StateCache`], each field
//! converted from the unit the cache stores it in to the unit the sentence
//! wants, followed by the standard `$...*hh\r\n` XOR checksum framing.
//! Client-count gating (skip rendering when nobody's connected) is the
//! broadcast server's job, not this module's — see [`crate::broadcast`].

use nmea2k::{FieldValue, StateCache};

const MPS_TO_KNOTS: f64 = 1.943_844_5;
const MPS_TO_KMH: f64 = 3.6;

/// Render the fixed NMEA 0183 sentence set from the current cache
/// snapshot. Any key still `Unknown` renders its substitution fields as
/// empty (valid, if useless, NMEA 0183 — talkers commonly omit fields they
/// can't fill).
pub fn render(cache: &StateCache) -> String {
    let mut output = String::new();

    output.push_str(&sentence(&format!(
        "SDDPT,{},{}",
        fmt_number(cache.get("Depth"), 1),
        fmt_number(cache.get("DepthOffset"), 1),
    )));

    let speed = cache.get("SpeedThroughWater");
    output.push_str(&sentence(&format!(
        "VWVHW,,,,,{},N,{},K",
        fmt_converted(speed.clone(), MPS_TO_KNOTS, 1),
        fmt_converted(speed, MPS_TO_KMH, 1),
    )));

    output.push_str(&sentence(&format!(
        "IIMWV,{},R,{},N,A",
        fmt_converted(cache.get("WindAngle"), 180.0 / std::f64::consts::PI, 1),
        fmt_converted(cache.get("WindSpeed"), MPS_TO_KNOTS, 1),
    )));

    output
}

fn fmt_number(value: Option<FieldValue>, decimals: usize) -> String {
    match value {
        Some(FieldValue::Number(n)) => format!("{:.*}", decimals, n),
        _ => String::new(),
    }
}

fn fmt_converted(value: Option<FieldValue>, factor: f64, decimals: usize) -> String {
    match value {
        Some(FieldValue::Number(n)) => format!("{:.*}", decimals, n * factor),
        _ => String::new(),
    }
}

fn sentence(body: &str) -> String {
    let checksum = body.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("${}*{:02x}\r\n", body, checksum)
}
