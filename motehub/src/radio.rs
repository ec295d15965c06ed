//! Interface to the proprietary-mode radio.
//!
//! The radio peripheral is modeled after the nRF5x RADIO block: a task/event state machine with
//! hardware address matching, CRC generation and configurable shortcuts between events and tasks.
//! This module only defines the typed interface; `motehub-nrf5x` maps it onto the real registers.
//! No policy lives here; sequencing the radio through an RX/ACK cycle is the job of
//! [`link`](crate::link).

use crate::frame::FRAME_LEN;
use bitflags::bitflags;

bitflags! {
    /// Hardware shortcuts between radio events and tasks.
    ///
    /// The bit positions are those of the nRF `SHORTS` register.
    pub struct Shorts: u32 {
        /// Start RX/TX as soon as the ramp-up finished.
        const READY_START = 1 << 0;
        /// Begin disabling the radio as soon as the packet ended.
        const END_DISABLE = 1 << 1;
    }
}

bitflags! {
    /// Radio interrupt sources.
    ///
    /// The bit positions are those of the nRF `INTENSET`/`INTENCLR` registers.
    pub struct Interrupts: u32 {
        /// Packet sent or received.
        const END = 1 << 3;
        /// Radio reached the `Disabled` state.
        const DISABLED = 1 << 4;
    }
}

enum_with_unknown! {
    /// Current state of the radio state machine (the nRF `STATE` register).
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum RadioState(u32) {
        Disabled = 0,
        RxRu = 1,
        RxIdle = 2,
        Rx = 3,
        RxDisable = 4,
        TxRu = 9,
        TxIdle = 10,
        Tx = 11,
        TxDisable = 12,
    }
}

/// Latched radio events the driver can observe and acknowledge.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// `EVENTS_END`: a packet was fully sent or received.
    End,
    /// `EVENTS_DISABLED`: the radio finished disabling.
    Disabled,
}

/// Transmission power of the ACK frames.
///
/// The remote motes walk this ladder adaptively; the hub always answers at full power so a mote
/// that barely reached us still hears its ACK.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxPower {
    Neg30dBm,
    Neg20dBm,
    Neg16dBm,
    Neg12dBm,
    Neg8dBm,
    Neg4dBm,
    ZerodBm,
    Pos4dBm,
}

/// Radio parameters of the mote protocol.
///
/// Every value here is part of the on-air contract with the deployed sensor motes and must be
/// programmed bit-identically: 2400 MHz, proprietary 250 kbit mode, no length field (fixed
/// 10-byte payload), 2-byte base address `0x63e0` with prefix `0x17` on logical address 0,
/// 3-byte CRC with the CRC-24 polynomial `0x864CFB` (initial value 0), little-endian.
#[derive(Debug, Copy, Clone)]
pub struct RadioConfig {
    pub frequency_mhz: u16,
    pub base_address: u32,
    pub address_prefix: u8,
    pub crc_poly: u32,
    pub crc_init: u32,
    pub tx_power: TxPower,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: 2400,
            base_address: 0x63e0,
            address_prefix: 0x17,
            crc_poly: 0x0086_4CFB,
            crc_init: 0,
            tx_power: TxPower::Pos4dBm,
        }
    }
}

/// Operations of the raw radio peripheral.
///
/// Implementations wrap the memory-mapped peripheral and own the single packet buffer the radio
/// DMA reads and writes. They perform no sequencing of their own: callers trigger tasks and
/// acknowledge events in exactly the order the protocol requires.
///
/// During a granted time slot the implementor of this trait is the *only* radio user; outside of
/// slots the BLE host owns the peripheral and none of these methods may be called.
pub trait RadioController {
    /// Powers the peripheral on, resetting all registers.
    fn power_on(&mut self);

    /// Powers the peripheral off.
    ///
    /// This is the final handoff back to the BLE host and must only happen once the radio reached
    /// the `Disabled` state.
    fn power_off(&mut self);

    /// Programs frequency, addresses, packet format, CRC and TX power.
    ///
    /// Must only be called while the radio is `Disabled`.
    fn configure(&mut self, config: &RadioConfig);

    /// Reads the live radio state.
    fn state(&self) -> RadioState;

    /// Replaces the active event→task shortcuts.
    fn set_shorts(&mut self, shorts: Shorts);

    /// Replaces the interrupt mask (clears all sources, then enables `mask`).
    fn set_interrupts(&mut self, mask: Interrupts);

    /// Triggers `TASKS_RXEN`: ramp up the receiver.
    fn enable_rx(&mut self);

    /// Triggers `TASKS_TXEN`: ramp up the transmitter.
    ///
    /// Implementations must place a memory barrier before the task trigger so that all prior
    /// writes to the packet buffer are visible to the radio DMA.
    fn enable_tx(&mut self);

    /// Triggers `TASKS_START`: start RX/TX from an idle ramp-up state.
    fn start(&mut self);

    /// Triggers `TASKS_DISABLE`: begin disabling the radio.
    fn disable(&mut self);

    /// If `event` is pending, acknowledges it and returns `true`.
    fn take_event(&mut self, event: RadioEvent) -> bool;

    /// Acknowledges `event` regardless of whether it was pending.
    fn clear_event(&mut self, event: RadioEvent);

    /// Whether the CRC of the last received packet was correct.
    fn crc_ok(&self) -> bool;

    /// Whether the last packet was received on logical address 0.
    ///
    /// The mote protocol only uses logical address 0; packets matching any other configured
    /// address are rejected.
    fn rx_match_zero(&self) -> bool;

    /// The packet buffer shared between RX and TX.
    ///
    /// After a received `End` event it holds the inbound frame; the ACK is encoded into the same
    /// buffer before TX ramp-up, which the mote protocol can afford because the inbound frame has
    /// been decoded by then.
    fn packet_buf(&mut self) -> &mut [u8; FRAME_LEN];
}
