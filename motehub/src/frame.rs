//! On-air frames of the mote protocol.
//!
//! Both directions use the same fixed 10-byte payload (no length field on the air), little-endian:
//!
//! ```notrust
//! Report (mote → hub):          ACK (hub → mote):
//! +----------+-----------+      +----------+-----------+
//! | addr_low | addr_high |      | addr_low | addr_high |
//! |  (4 B)   |   (2 B)   |      |  (4 B)   |   (2 B)   |
//! +----------+-----------+      +----------+-----------+
//! |  temp    | voltage   |      | reserved |  flags    |
//! |  (2 B)   |   (2 B)   |      |  (2 B)   |  (2 B)    |
//! +----------+-----------+      +----------+-----------+
//! ```
//!
//! Preamble, access address and the 3-byte CRC are generated by the radio hardware and configured
//! via [`RadioConfig`](crate::radio::RadioConfig).

use crate::bytes::{ByteReader, ByteWriter, FromBytes, ToBytes};
use crate::Error;
use core::fmt;

/// Size of the fixed frame payload in bytes.
pub const FRAME_LEN: usize = 10;

/// Flag bit acknowledging a received report.
pub const FLAG_ACK: u16 = 0x8000;

/// The 48-bit factory address identifying a mote.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct NodeAddr {
    pub high: u16,
    pub low: u32,
}

impl fmt::Debug for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}{:08X}", self.high, self.low)
    }
}

/// A measurement report received from a mote.
///
/// Temperatures are centidegrees Celsius, voltages are centivolts; `0x7FFF` in either field means
/// the mote could not take that measurement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Report {
    pub addr: NodeAddr,
    pub temperature: i16,
    pub voltage: i16,
}

impl<'a> FromBytes<'a> for Report {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let low = bytes.read_u32_le()?;
        let high = bytes.read_u16_le()?;
        Ok(Report {
            addr: NodeAddr { high, low },
            temperature: bytes.read_i16_le()?,
            voltage: bytes.read_i16_le()?,
        })
    }
}

impl ToBytes for Report {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u32_le(self.addr.low)?;
        writer.write_u16_le(self.addr.high)?;
        writer.write_i16_le(self.temperature)?;
        writer.write_i16_le(self.voltage)
    }
}

/// The acknowledgement sent back within the same slot.
///
/// Echoes the mote's address so the mote can tell the ACK is meant for it; the reserved field is
/// always transmitted as zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ack {
    pub addr: NodeAddr,
}

impl ToBytes for Ack {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u32_le(self.addr.low)?;
        writer.write_u16_le(self.addr.high)?;
        writer.write_u16_le(0)?;
        writer.write_u16_le(FLAG_ACK)
    }
}
