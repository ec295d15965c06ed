use core::fmt;

/// Errors returned by the byte codec and protocol layers.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A length field or buffer size did not match the data.
    InvalidLength,

    /// Invalid value supplied for a field.
    InvalidValue,

    /// Ran out of buffer space while reading or writing.
    ///
    /// Returned when a value does not fit into the remaining space of a fixed
    /// buffer, and when reading past the end of a received packet.
    Eof,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Error::InvalidLength => "invalid length value specified",
            Error::InvalidValue => "invalid value for field",
            Error::Eof => "end of buffer",
        })
    }
}
