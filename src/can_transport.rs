//! Live CAN socket transport.
//!
//! Open with automatic retry, set a read timeout so the process can still
//! do periodic work while the bus is quiet, and translate each frame's
//! extended 29-bit identifier plus data into the same `(id, bytes)` pair
//! [`crate::log_replay`] produces, so both paths share one `handle_frame`
//! call site in `main`.

use std::time::Duration;

use socketcan::{CanSocket, EmbeddedFrame, ExtendedId, Frame, Socket};
use tracing::{info, warn};

/// Open `interface`, retrying every 10 seconds on failure. Never gives up —
/// the bus may simply not be up yet when the process starts.
pub fn open_with_retry(interface: &str) -> CanSocket {
    loop {
        match CanSocket::open(interface) {
            Ok(socket) => {
                info!(interface, "opened CAN interface");
                return socket;
            }
            Err(e) => {
                warn!(interface, error = %e, "failed to open CAN interface, retrying in 10s");
                std::thread::sleep(Duration::from_secs(10));
            }
        }
    }
}

/// Set a read timeout so the receive loop in `main` periodically wakes up
/// even with no bus traffic.
pub fn configure(socket: &mut CanSocket) -> std::io::Result<()> {
    socket.set_read_timeout(Duration::from_millis(500))
}

/// Read one frame and split it into its raw 29-bit identifier and data
/// bytes. Frames with a standard (11-bit) identifier are not valid NMEA
/// 2000 traffic and are rejected.
pub fn read_frame(socket: &CanSocket) -> std::io::Result<(u32, Vec<u8>)> {
    let frame = socket.read_frame()?;
    let can_id = frame.can_id();
    let extended_id = ExtendedId::new(can_id.as_raw())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "expected a 29-bit extended CAN id"))?;

    Ok((extended_id.as_raw(), frame.data().to_vec()))
}
