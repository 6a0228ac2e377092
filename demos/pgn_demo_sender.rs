//! Demonstration PGN transmitter, not part of the core pipeline.
//!
//! Encodes a depth reading and a sweep of wind readings and writes them
//! onto a socketcan interface. Sends PGN 130306 as a single short frame
//! even though its catalog `Length` (12) calls for Fast Packet — reproduced
//! deliberately rather than silently "fixed", since this is a demonstration
//! transmitter, not a catalog-accurate encoder.

use std::thread;
use std::time::Duration;

use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Socket};

const PGN_WATER_DEPTH: u32 = 128267;
const PGN_WIND_DATA: u32 = 130306;
const DEFAULT_PRIORITY: u32 = 3;
const DEFAULT_SOURCE: u32 = 0;

/// Build a 29-bit PDU2 (broadcast) identifier for `pgn`, matching
/// `nmea2k::ArbitrationId::from_raw`'s decoding in reverse.
fn arbitration_id(pgn: u32, priority: u32, source: u32) -> u32 {
    let dp = (pgn >> 16) & 0x1;
    let pf = (pgn >> 8) & 0xff;
    let ps = pgn & 0xff;
    (priority << 26) | (dp << 24) | (pf << 16) | (ps << 8) | source
}

fn send(socket: &CanSocket, pgn: u32, data: [u8; 8]) {
    let id = ExtendedId::new(arbitration_id(pgn, DEFAULT_PRIORITY, DEFAULT_SOURCE)).expect("29-bit id");
    let frame = CanFrame::new(id, &data).expect("valid 8-byte CAN frame");
    if let Err(e) = socket.write_frame(&frame) {
        eprintln!("failed to send pgn {pgn}: {e}");
    }
}

/// PGN 128267 Water Depth: SID unknown, `depth_m` at resolution 0.01,
/// offset left at 0.0 (the source never sets it either).
fn send_depth(socket: &CanSocket, depth_m: f64) {
    let mut data = [0u8; 8];
    data[0] = 0xff;
    let raw = (depth_m * 100.0).round() as i32;
    data[1..5].copy_from_slice(&raw.to_le_bytes());
    println!("{}", data.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "));
    send(socket, PGN_WATER_DEPTH, data);
}

/// PGN 130306 Wind Data: SID unknown, `speed_ms` at resolution 0.01,
/// `angle_deg` converted to radians at resolution 0.0001, Reference fixed
/// to `Apparent` (byte 5 low 3 bits = 2) as the source hardcodes `0xfa`.
fn send_wind(socket: &CanSocket, speed_ms: f64, angle_deg: f64) {
    let mut data = [0u8; 8];
    data[0] = 0xff;
    let speed_raw = (speed_ms * 100.0).round() as u16;
    let angle_raw = (angle_deg.to_radians() * 10_000.0).round() as u16;
    data[1..3].copy_from_slice(&speed_raw.to_le_bytes());
    data[3..5].copy_from_slice(&angle_raw.to_le_bytes());
    data[5] = 0xfa;
    data[6] = 0xff;
    data[7] = 0xff;
    println!("{}", data.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "));
    send(socket, PGN_WIND_DATA, data);
}

fn main() {
    let interface = std::env::args().nth(1).unwrap_or_else(|| "vcan0".to_string());
    let socket = CanSocket::open(&interface).unwrap_or_else(|e| panic!("failed to open {interface}: {e}"));

    send_depth(&socket, 25.0);

    for angle in 0..360 {
        send_wind(&socket, 7.25, angle as f64);
        thread::sleep(Duration::from_millis(100));
    }

    println!("Message sent");
}
