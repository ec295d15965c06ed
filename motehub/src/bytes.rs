//! Zero-copy packet encoding and decoding.
//!
//! Everything that crosses a byte boundary (on-air frames, command packets, advertising data)
//! implements [`ToBytes`] and/or [`FromBytes`]. The [`ByteWriter`] and [`ByteReader`] helpers wrap
//! a `&mut [u8]` or `&[u8]` and keep track of the current position.
//!
//! All multibyte accessors use little-endian byte order; that is the byte order of every protocol
//! this crate speaks.

use crate::Error;
use byteorder::{ByteOrder, LittleEndian};
use core::mem;

/// Writes values into a borrowed byte buffer, front to back.
///
/// All `write_*` methods return `Error::Eof` when the remaining buffer space is too small, and
/// leave the buffer unmodified in that case.
pub struct ByteWriter<'a>(&'a mut [u8]);

impl<'a> ByteWriter<'a> {
    /// Creates a writer that will fill `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        ByteWriter(buf)
    }

    /// Returns the number of bytes that can still be written.
    pub fn space_left(&self) -> usize {
        self.0.len()
    }

    /// Splits off the next byte so it can be filled in after later data was written.
    ///
    /// Returns `None` when the buffer is full. The buffer position advances past the returned
    /// byte.
    pub fn split_next_mut(&mut self) -> Option<&'a mut u8> {
        let this = mem::replace(&mut self.0, &mut []);
        if this.is_empty() {
            self.0 = this;
            None
        } else {
            let (first, rest) = this.split_first_mut().unwrap();
            self.0 = rest;
            Some(first)
        }
    }

    /// Copies all bytes of `other` into the buffer.
    pub fn write_slice(&mut self, other: &[u8]) -> Result<(), Error> {
        if self.space_left() < other.len() {
            Err(Error::Eof)
        } else {
            self.0[..other.len()].copy_from_slice(other);
            let this = mem::replace(&mut self.0, &mut []);
            self.0 = &mut this[other.len()..];
            Ok(())
        }
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, byte: u8) -> Result<(), Error> {
        let first = self.split_next_mut().ok_or(Error::Eof)?;
        *first = byte;
        Ok(())
    }

    /// Writes a `u16`, little-endian.
    pub fn write_u16_le(&mut self, value: u16) -> Result<(), Error> {
        let mut bytes = [0; 2];
        LittleEndian::write_u16(&mut bytes, value);
        self.write_slice(&bytes)
    }

    /// Writes a `u32`, little-endian.
    pub fn write_u32_le(&mut self, value: u32) -> Result<(), Error> {
        let mut bytes = [0; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.write_slice(&bytes)
    }

    /// Writes an `i16`, little-endian.
    pub fn write_i16_le(&mut self, value: i16) -> Result<(), Error> {
        self.write_u16_le(value as u16)
    }
}

/// Reads values out of a borrowed byte slice, front to back.
pub struct ByteReader<'a>(&'a [u8]);

impl<'a> ByteReader<'a> {
    /// Creates a new reader over `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader(bytes)
    }

    /// Returns the number of bytes not yet read.
    pub fn bytes_left(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the reader has reached the end of the input.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads a slice of `len` bytes.
    ///
    /// Returns `Error::Eof` without advancing when fewer than `len` bytes remain.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.bytes_left() < len {
            Err(Error::Eof)
        } else {
            let slice = &self.0[..len];
            self.0 = &self.0[len..];
            Ok(slice)
        }
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<S>(&mut self) -> Result<S, Error>
    where
        S: Default + AsMut<[u8]>,
    {
        let mut buf = S::default();
        let slice = buf.as_mut();
        if self.bytes_left() < slice.len() {
            return Err(Error::Eof);
        }

        slice.copy_from_slice(&self.0[..slice.len()]);
        self.0 = &self.0[slice.len()..];
        Ok(buf)
    }

    /// Reads all remaining bytes, leaving the reader at EOF.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.0;
        self.0 = &[];
        rest
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_array::<[u8; 1]>()?[0])
    }

    /// Reads a `u16`, little-endian.
    pub fn read_u16_le(&mut self) -> Result<u16, Error> {
        let arr = self.read_array::<[u8; 2]>()?;
        Ok(LittleEndian::read_u16(&arr))
    }

    /// Reads a `u32`, little-endian.
    pub fn read_u32_le(&mut self) -> Result<u32, Error> {
        let arr = self.read_array::<[u8; 4]>()?;
        Ok(LittleEndian::read_u32(&arr))
    }

    /// Reads an `i16`, little-endian.
    pub fn read_i16_le(&mut self) -> Result<i16, Error> {
        Ok(self.read_u16_le()? as i16)
    }
}

/// Trait for encoding a value into a byte buffer.
pub trait ToBytes {
    /// Encodes `self` into `writer`, advancing it past the encoded value.
    ///
    /// When `writer` runs out of space an error is returned and the buffer contents are
    /// unspecified (the value may have been partially written).
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error>;
}

/// Trait for decoding values from a byte slice.
pub trait FromBytes<'a>: Sized {
    /// Decodes a `Self` out of `bytes`, advancing the reader past the consumed data.
    ///
    /// On error, the position of `bytes` is unspecified.
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error>;
}
