//! Chip-specific helpers.

use crate::pac;
use motehub::frame::NodeAddr;

/// Returns this device's 48-bit address from the FICR (factory information configuration
/// registers).
///
/// The motes stamp their frames with the same FICR value, so hub and motes share one address
/// format; the hub itself uses it for identity and logging.
pub fn device_address() -> NodeAddr {
    // FICR is read-only, so accessing it directly is safe.
    let ficr = unsafe { &*pac::FICR::ptr() };

    NodeAddr {
        low: ficr.deviceaddr[0].read().bits(),
        high: ficr.deviceaddr[1].read().bits() as u16,
    }
}
