//! 128-bit UUIDs for the vendor GATT service.
//!
//! The hub only ever deals in full 128-bit UUIDs (the vendor service and its characteristic are
//! not SIG-assigned), so the 16- and 32-bit alias forms are not implemented.

use crate::bytes::{ByteWriter, ToBytes};
use crate::Error;
use core::fmt;

/// A full 128-bit UUID.
#[derive(PartialEq, Eq, Copy, Clone)]
pub struct Uuid128([u8; 16]);

impl Uuid128 {
    /// Creates a 128-bit UUID from 16 raw bytes (encoded in big-endian).
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw big-endian bytes of the UUID.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<uuid::Uuid> for Uuid128 {
    fn from(uuid: uuid::Uuid) -> Self {
        Uuid128(*uuid.as_bytes())
    }
}

/// Encodes the UUID the way it is carried in advertising data: reversed, LSB first.
impl ToBytes for Uuid128 {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        let mut le = self.0;
        le.reverse();
        writer.write_slice(&le)
    }
}

impl fmt::Debug for Uuid128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [_0, _1, _2, _3, _4, _5, _6, _7, _8, _9, _10, _11, _12, _13, _14, _15] = self.0;
        let a = u32::from_be_bytes([_0, _1, _2, _3]);
        let b = u16::from_be_bytes([_4, _5]);
        let c = u16::from_be_bytes([_6, _7]);
        let d = u16::from_be_bytes([_8, _9]);
        let e = u64::from_be_bytes([0, 0, _10, _11, _12, _13, _14, _15]);
        write!(f, "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}", a, b, c, d, e)
    }
}
