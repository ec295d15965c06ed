//! Points in time and durations with microsecond resolution.
//!
//! These types use 32-bit arithmetic throughout; the longest interval the firmware reasons about
//! is a one-second slot-request timeout, far below the ~1 hour the representation can hold.

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};

/// A duration with microsecond resolution.
///
/// Overflowing arithmetic on durations panics; none of the intervals handled here come anywhere
/// near the representable range.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(u32);

impl Duration {
    /// Creates a `Duration` from a number of microseconds.
    pub const fn from_micros(micros: u32) -> Self {
        Duration(micros)
    }

    /// Creates a `Duration` representing the given number of milliseconds.
    pub const fn from_millis(millis: u16) -> Self {
        Duration(millis as u32 * 1_000)
    }

    /// Creates a `Duration` representing a number of seconds.
    pub const fn from_secs(secs: u16) -> Self {
        Duration(secs as u32 * 1_000_000)
    }

    /// Returns the number of whole seconds that fit in `self`.
    pub fn whole_secs(&self) -> u32 {
        self.0 / 1_000_000
    }

    /// Returns the number of whole milliseconds that fit in `self`.
    pub fn whole_millis(&self) -> u32 {
        self.0 / 1_000
    }

    /// Returns the number of microseconds represented by `self`.
    pub fn as_micros(&self) -> u32 {
        self.0
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Duration(self.0.checked_add(rhs.0).expect("duration overflow"))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Duration(self.0.checked_sub(rhs.0).expect("duration underflow"))
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000 {
            let (secs, rest) = (self.0 / 1_000_000, self.0 % 1_000_000);
            if rest == 0 {
                write!(f, "{}s", secs)
            } else {
                write!(f, "{}.{:06}s", secs, rest)
            }
        } else if self.0 >= 1000 {
            let (millis, rest) = (self.0 / 1000, self.0 % 1000);
            if rest == 0 {
                write!(f, "{}ms", millis)
            } else {
                write!(f, "{}.{:03}ms", millis, rest)
            }
        } else {
            write!(f, "{}µs", self.0)
        }
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

/// A point in time, relative to an unspecified epoch.
///
/// `Instant`s come from a [`Timer`] implementation and wrap around after about an hour. Apart from
/// the wraparound they are monotonic. Instants obtained from different timers must not be mixed.
#[derive(Copy, Clone)]
pub struct Instant(u32);

impl Instant {
    /// Creates an `Instant` from raw microseconds since the timer's reference point.
    ///
    /// This should only be called from a [`Timer`] implementation.
    pub fn from_raw_micros(micros: u32) -> Self {
        Instant(micros)
    }

    /// Returns the raw value from which this `Instant` was created.
    pub fn raw_micros(&self) -> u32 {
        self.0
    }

    /// Calculates the time that passed between `earlier` and `self`.
    ///
    /// Both instants must come from the same timer and must be less than one wraparound period
    /// apart, otherwise the result is meaningless.
    pub fn duration_since(&self, earlier: Instant) -> Duration {
        Duration(self.0.wrapping_sub(earlier.0))
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.duration_since(rhs)
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, d: Duration) -> Self {
        Instant(self.0.wrapping_add(d.as_micros()))
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, d: Duration) {
        *self = *self + d;
    }
}

impl Sub<Duration> for Instant {
    type Output = Self;

    fn sub(self, d: Duration) -> Self {
        Instant(self.0.wrapping_sub(d.as_micros()))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Duration(self.0))
    }
}

impl fmt::Debug for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

/// Trait for time providers with microsecond accuracy.
///
/// This can also be implemented by a mock timer for testing.
pub trait Timer {
    /// Obtains the current time as an [`Instant`].
    ///
    /// The returned instants must never move backwards in time, except when the underlying value
    /// wraps around.
    fn now(&self) -> Instant;
}
