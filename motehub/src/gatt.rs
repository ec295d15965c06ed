//! GATT surface of the hub.
//!
//! The GATT server itself lives in the BLE host stack; this module provides what the host needs
//! to register it: the vendor service and characteristic UUIDs, the characteristic properties,
//! and the advertising payload. The hub is a battery device that is rarely interacted with, so
//! it advertises at the slow interval.

use crate::bytes::{ByteWriter, ToBytes};
use crate::time::Duration;
use crate::uuid::Uuid128;
use crate::Error;
use bitflags::bitflags;

/// The vendor service (`CC2AF14A-2AAF-4C6E-B2E4-3856EE2B4267`).
pub const SERVICE_UUID: Uuid128 = Uuid128::from_bytes([
    0xCC, 0x2A, 0xF1, 0x4A, 0x2A, 0xAF, 0x4C, 0x6E, 0xB2, 0xE4, 0x38, 0x56, 0xEE, 0x2B, 0x42,
    0x67,
]);

/// The chunked request/response characteristic (`45CC8E0B-8507-45F7-AC95-B798D0FD732A`).
pub const ENDPOINT_UUID: Uuid128 = Uuid128::from_bytes([
    0x45, 0xCC, 0x8E, 0x0B, 0x85, 0x07, 0x45, 0xF7, 0xAC, 0x95, 0xB7, 0x98, 0xD0, 0xFD, 0x73,
    0x2A,
]);

/// Slow advertising interval bounds (1 s to 1.2 s).
pub const ADV_INTERVAL_MIN: Duration = Duration::from_millis(1000);
pub const ADV_INTERVAL_MAX: Duration = Duration::from_millis(1200);

bitflags! {
    /// GAP flags carried in the advertising data.
    pub struct Flags: u8 {
        const LE_LIMITED_DISCOVERABLE = 0x01;
        const LE_GENERAL_DISCOVERABLE = 0x02;
        const NO_BREDR = 0x04;
    }
}

bitflags! {
    /// GATT characteristic property bits.
    pub struct Properties: u8 {
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
    }
}

/// Properties of the chunked endpoint characteristic.
pub const ENDPOINT_PROPERTIES: Properties = Properties::from_bits_truncate(
    Properties::READ.bits() | Properties::WRITE.bits(),
);

// AD structure type bytes from the GAP assigned numbers.
const TYPE_FLAGS: u8 = 0x01;
const TYPE_SERVICE_UUIDS_128: u8 = 0x07;
const TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// A single advertising data structure.
#[derive(Debug, Copy, Clone)]
pub enum AdStructure<'a> {
    /// Device flags and baseband capabilities.
    Flags(Flags),

    /// Complete list of 128-bit service UUIDs.
    ServiceUuids128(&'a [Uuid128]),

    /// The full device name.
    CompleteLocalName(&'a str),
}

impl<'a> ToBytes for AdStructure<'a> {
    fn to_bytes(&self, buf: &mut ByteWriter<'_>) -> Result<(), Error> {
        // First byte is the length of the record; write it once the payload size is known.
        let length = buf.split_next_mut().ok_or(Error::Eof)?;

        let before = buf.space_left();
        match self {
            AdStructure::Flags(flags) => {
                buf.write_u8(TYPE_FLAGS)?;
                buf.write_u8(flags.bits())?;
            }
            AdStructure::ServiceUuids128(uuids) => {
                buf.write_u8(TYPE_SERVICE_UUIDS_128)?;
                for uuid in *uuids {
                    uuid.to_bytes(buf)?;
                }
            }
            AdStructure::CompleteLocalName(name) => {
                buf.write_u8(TYPE_COMPLETE_LOCAL_NAME)?;
                buf.write_slice(name.as_bytes())?;
            }
        }

        *length = (before - buf.space_left()) as u8;
        Ok(())
    }
}

/// Encodes the hub's advertising payload into `buf` and returns its length.
///
/// General-discoverable, no BR/EDR, carrying the vendor service UUID. The device name is left to
/// the host stack, which appends it when space allows.
pub fn advertising_data(buf: &mut [u8]) -> Result<usize, Error> {
    let mut writer = ByteWriter::new(buf);
    let before = writer.space_left();

    AdStructure::Flags(Flags::LE_GENERAL_DISCOVERABLE | Flags::NO_BREDR).to_bytes(&mut writer)?;
    AdStructure::ServiceUuids128(&[SERVICE_UUID]).to_bytes(&mut writer)?;

    Ok(before - writer.space_left())
}
