//! Chunked request/response framing over the vendor characteristic.
//!
//! The characteristic moves at most [`CHUNK_SIZE`] payload bytes per ATT read or write, so
//! variable-length command packets are carried as a sequence of chunks. Byte 0 of every chunk is
//! the framing header:
//!
//! ```notrust
//! MSB                               LSB
//! +-------+-------+-----------------+
//! |  END  | BEGIN |   message id    |
//! | 1 bit | 1 bit |     6 bits      |
//! +-------+-------+-----------------+
//! ```
//!
//! `BEGIN` starts a fresh message and establishes its id; every following chunk must repeat the
//! id, and `END` completes the message. The id lets a client detect that another client (or a
//! reconnect) interleaved with its transfer: the mismatching chunk is rejected, the partial
//! message is discarded, and a new `BEGIN` recovers.
//!
//! Responses are read back with the same header: `BEGIN` set on the first chunk, `END` on the
//! last, the low bits carrying the id of the request that produced the response.

/// Payload bytes per chunk.
pub const CHUNK_SIZE: usize = 16;

/// Capacity of the reassembled request buffer.
pub const REQUEST_MAX: usize = 512;

/// Capacity of the response buffer.
pub const RESPONSE_MAX: usize = 512;

const FLAG_BEGIN: u8 = 0x40;
const FLAG_END: u8 = 0x80;
const ID_MASK: u8 = 0x3F;

/// Id value while no message is being assembled; distinguishable from any masked id.
const NO_ID: u8 = 0xFF;

enum_with_unknown! {
    /// Attribute-protocol error codes surfaced to the BLE host.
    ///
    /// These are the standard ATT application error values; the host stack forwards them to the
    /// client verbatim.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum AttError(u8) {
        /// Offset was past the end of the attribute.
        InvalidOffset = 0x07,
        /// Attribute value has an incorrect length for the operation.
        InvalidAttributeValueLength = 0x0D,
        /// The value to be written does not obey the attribute's format.
        ValueNotAllowed = 0x13,
    }
}

/// Result of accepting a write chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome {
    /// More chunks of this message are expected.
    More,
    /// The chunk carried `END`: a complete request is available via
    /// [`ChunkedEndpoint::request`].
    Complete,
}

/// One outbound chunk, header byte included.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Chunk {
    len: u8,
    bytes: [u8; 1 + CHUNK_SIZE],
}

impl Chunk {
    fn empty() -> Self {
        Self {
            len: 0,
            bytes: [0; 1 + CHUNK_SIZE],
        }
    }

    /// The bytes to hand to the ATT read, possibly empty.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Reassembly and readout state of the vendor characteristic.
///
/// Writes and reads arrive in the BLE host's callback context; the completed request is consumed
/// and the response produced by the worker. The response buffer is only observable through reads
/// once [`send_response`](Self::send_response) published it, so a client polling with reads
/// simply sees zero bytes until its command finished.
pub struct ChunkedEndpoint {
    request: [u8; REQUEST_MAX],
    request_size: usize,
    request_id: u8,
    request_offset: usize,

    response: [u8; RESPONSE_MAX],
    response_size: usize,
    response_id: u8,
    response_offset: usize,
}

impl ChunkedEndpoint {
    pub fn new() -> Self {
        Self {
            request: [0; REQUEST_MAX],
            request_size: 0,
            request_id: NO_ID,
            request_offset: 0,
            response: [0; RESPONSE_MAX],
            response_size: 0,
            response_id: NO_ID,
            response_offset: 0,
        }
    }

    /// Accepts one write to the characteristic.
    ///
    /// `chunk` is the raw attribute value: header byte plus up to [`CHUNK_SIZE`] payload bytes.
    /// Any error discards the partially assembled message.
    pub fn write_chunk(&mut self, offset: u16, chunk: &[u8]) -> Result<WriteOutcome, AttError> {
        debug!("chunk write: {} bytes at {}", chunk.len(), offset);

        if offset != 0 {
            return Err(self.reject(AttError::InvalidOffset));
        }
        if chunk.is_empty() || chunk.len() - 1 > CHUNK_SIZE {
            return Err(self.reject(AttError::InvalidAttributeValueLength));
        }

        let header = chunk[0];
        let payload = &chunk[1..];

        if header & FLAG_BEGIN != 0 {
            self.request_id = header & ID_MASK;
            self.request_offset = 0;
            self.request_size = 0;
        } else if header & ID_MASK != self.request_id {
            return Err(self.reject(AttError::ValueNotAllowed));
        }

        if self.request_offset + payload.len() > REQUEST_MAX {
            return Err(self.reject(AttError::InvalidAttributeValueLength));
        }

        self.request[self.request_offset..self.request_offset + payload.len()]
            .copy_from_slice(payload);
        self.request_offset += payload.len();
        self.request_size = self.request_offset;

        if header & FLAG_END != 0 {
            // The response id is pinned now; the previous response (if any) becomes
            // unreadable before the new command runs.
            self.response_id = self.request_id;
            self.response_size = 0;
            self.response_offset = 0;
            self.request_id = NO_ID;
            self.request_offset = 0;
            Ok(WriteOutcome::Complete)
        } else {
            Ok(WriteOutcome::More)
        }
    }

    /// Serves one read from the characteristic.
    ///
    /// `avail` is the attribute read length offered by the host; it must cover a full chunk.
    pub fn read_chunk(&mut self, offset: u16, avail: usize) -> Result<Chunk, AttError> {
        debug!("chunk read: {} bytes at {}", avail, offset);

        if offset != 0 || avail <= 1 + CHUNK_SIZE {
            return Err(AttError::InvalidOffset);
        }

        let mut chunk = Chunk::empty();

        if self.response_size == 0 {
            // No response yet; zero bytes tells the client to poll again.
            return Ok(chunk);
        }

        if self.response_offset >= self.response_size {
            // Fully consumed: keep answering with a bare END header.
            chunk.bytes[0] = self.response_id | FLAG_END;
            chunk.len = 1;
            return Ok(chunk);
        }

        let send = (self.response_size - self.response_offset).min(CHUNK_SIZE);
        let mut header = self.response_id;
        if self.response_offset == 0 {
            header |= FLAG_BEGIN;
        }
        chunk.bytes[1..1 + send]
            .copy_from_slice(&self.response[self.response_offset..self.response_offset + send]);
        self.response_offset += send;
        if self.response_offset == self.response_size {
            header |= FLAG_END;
        }
        chunk.bytes[0] = header;
        chunk.len = 1 + send as u8;
        Ok(chunk)
    }

    /// The completed request, valid after [`WriteOutcome::Complete`] until the next `BEGIN`.
    pub fn request(&self) -> &[u8] {
        &self.request[..self.request_size]
    }

    /// The response buffer for the command dispatcher to fill.
    pub fn response_buf(&mut self) -> &mut [u8; RESPONSE_MAX] {
        &mut self.response
    }

    /// Borrows the completed request and the response buffer at the same time, for executing a
    /// command in place.
    pub fn exchange(&mut self) -> (&[u8], &mut [u8; RESPONSE_MAX]) {
        (&self.request[..self.request_size], &mut self.response)
    }

    /// Publishes `size` bytes of the response buffer for readout.
    pub fn send_response(&mut self, size: usize) {
        self.response_size = size.min(RESPONSE_MAX);
        self.response_offset = 0;
    }

    fn reject(&mut self, error: AttError) -> AttError {
        self.request_id = NO_ID;
        self.request_offset = 0;
        self.request_size = 0;
        error
    }
}

impl Default for ChunkedEndpoint {
    fn default() -> Self {
        Self::new()
    }
}
