//! Motehub drivers for the nRF51/nRF52-series radios and timers.
//!
//! Implements the hardware traits of the `motehub` core crate on top of the chip PACs: the
//! proprietary-mode radio ([`radio::SensorRadio`]) and the slot-local timer
//! ([`timer::SlotTimer0`]).
//!
//! Only chips whose radio still implements the proprietary 250 kbit mode are supported; the
//! deployed sensor motes speak nothing else.

#![no_std]
#![warn(rust_2018_idioms)]

#[cfg(feature = "51")]
use nrf51_hal::pac;

#[cfg(feature = "52832")]
use nrf52832_hal::pac;

pub mod radio;
pub mod timer;
pub mod utils;
