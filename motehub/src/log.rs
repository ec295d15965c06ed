//! Logging shims.
//!
//! When the `log` feature is enabled these forward to the `log` crate; otherwise the arguments
//! are type-checked via `format_args!` and compiled away. Only the levels actually used by the
//! crate are defined.

#[cfg(feature = "log")]
macro_rules! warn {
    ($($t:tt)*) => {{ ::log::warn!($($t)*); }};
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($t:tt)*) => {{ ::log::debug!($($t)*); }};
}

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => {{ ::log::trace!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($t:tt)*) => {{ format_args!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($t:tt)*) => {{ format_args!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {{ format_args!($($t)*); }};
}
