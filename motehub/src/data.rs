//! The hub's configuration and runtime state regions.
//!
//! Both regions are read and written over BLE as raw little-endian memory (see
//! [`cmd`](crate::cmd)), so their layouts are part of the external interface: `#[repr(C)]`,
//! declaration order, every reserved byte explicit so the structs contain no hidden padding.
//! The `version` byte exists so future layout changes can be detected by clients.
//!
//! [`Config`] holds what survives a reboot (mote table, channel definitions, time zone) and is
//! only made durable by an explicit `KEEP` command through a [`ConfigStore`]. [`State`] is
//! volatile: per-mote last readings and the reduced per-channel values.

use crate::frame::NodeAddr;
use core::ptr;
use zerocopy::{AsBytes, FromBytes};

/// Capacity of the mote table.
pub const NODE_CAP: usize = 32;

/// Capacity of the channel table.
pub const CHANNEL_CAP: usize = 8;

/// Fixed size of mote and channel name fields.
pub const NAME_LEN: usize = 48;

/// Sentinel measurement value: "no value available".
pub const NO_VALUE: i16 = 0x7FFF;

/// Channel byte of a mote that has not been assigned to any channel.
pub const CHANNEL_UNASSIGNED: u8 = 0xFF;

enum_with_unknown! {
    /// Reduction applied over all motes assigned to a channel.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum ChannelFunction(u8) {
        Min = 0,
        Max = 1,
        Avg = 2,
    }
}

/// One daylight-saving transition rule (fields relative to the base UTC offset).
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct DaylightTransition {
    pub time: i16,
    pub month: i8,
    /// Negative for a fixed day-of-month, positive or zero for a floating weekday rule.
    pub day: i8,
    /// Negative counts backwards from the end of the month.
    pub week: i8,
    pub _reserved: i8,
}

/// Time zone of the hub's display clock.
///
/// The calendar conversion itself is done by the host application; the hub only stores and
/// serves these values.
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct TimeZone {
    pub utc_offset: i16,
    /// Daylight saving is disabled when zero.
    pub daylight_delta: i16,
    pub daylight_start: DaylightTransition,
    pub daylight_end: DaylightTransition,
}

/// Configuration entry for one known mote.
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct ConfigNode {
    pub addr_low: u32,
    pub addr_high: u16,
    /// Channel index, or [`CHANNEL_UNASSIGNED`].
    pub channel: u8,
    pub _reserved: u8,
    pub name: [u8; NAME_LEN],
}

impl ConfigNode {
    const EMPTY: Self = Self {
        addr_low: 0,
        addr_high: 0,
        channel: CHANNEL_UNASSIGNED,
        _reserved: 0,
        name: [0; NAME_LEN],
    };

    pub fn addr(&self) -> NodeAddr {
        NodeAddr {
            high: self.addr_high,
            low: self.addr_low,
        }
    }

    pub fn set_addr(&mut self, addr: NodeAddr) {
        self.addr_high = addr.high;
        self.addr_low = addr.low;
    }

    /// Replaces the name, truncating to [`NAME_LEN`] bytes and zero-padding the rest.
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; NAME_LEN];
        let n = name.len().min(NAME_LEN);
        self.name[..n].copy_from_slice(&name.as_bytes()[..n]);
    }
}

/// Configuration entry for one logical channel.
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct ConfigChannel {
    /// Raw [`ChannelFunction`] value.
    pub func: u8,
    pub name: [u8; NAME_LEN],
}

impl ConfigChannel {
    const EMPTY: Self = Self {
        func: 0,
        name: [0; NAME_LEN],
    };

    pub fn function(&self) -> ChannelFunction {
        ChannelFunction::from(self.func)
    }
}

/// The persistent configuration region (`tag = 0` in the command protocol).
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct Config {
    pub version: u8,
    /// Number of live entries at the front of `nodes`; the rest is undefined.
    pub node_count: u8,
    pub channel_count: u8,
    pub _reserved: u8,
    pub time_zone: TimeZone,
    pub nodes: [ConfigNode; NODE_CAP],
    pub channels: [ConfigChannel; CHANNEL_CAP],
}

impl Config {
    pub fn new() -> Self {
        Self {
            version: 0,
            node_count: 0,
            channel_count: 0,
            _reserved: 0,
            time_zone: TimeZone {
                utc_offset: 0,
                daylight_delta: 0,
                daylight_start: DaylightTransition {
                    time: 0,
                    month: 0,
                    day: 0,
                    week: 0,
                    _reserved: 0,
                },
                daylight_end: DaylightTransition {
                    time: 0,
                    month: 0,
                    day: 0,
                    week: 0,
                    _reserved: 0,
                },
            },
            nodes: [ConfigNode::EMPTY; NODE_CAP],
            channels: [ConfigChannel::EMPTY; CHANNEL_CAP],
        }
    }

    /// The live prefix of the mote table.
    ///
    /// `node_count` can hold an out-of-range value after a raw configuration write; it is clamped
    /// here rather than trusted.
    pub fn live_nodes(&self) -> &[ConfigNode] {
        &self.nodes[..(self.node_count as usize).min(NODE_CAP)]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Last known readings of one mote, index-aligned with `Config::nodes`.
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct StateNode {
    /// Seconds since boot of the last report, 0 if never updated.
    pub last_update: u32,
    pub temperature: i16,
    pub voltage: i16,
}

impl StateNode {
    pub const EMPTY: Self = Self {
        last_update: 0,
        temperature: NO_VALUE,
        voltage: NO_VALUE,
    };
}

/// Reduced value of one channel.
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct StateChannel {
    pub temperature: i16,
}

/// The volatile state region (`tag = 1` in the command protocol).
#[derive(Debug, Copy, Clone, FromBytes, AsBytes)]
#[repr(C)]
pub struct State {
    /// UTC seconds minus uptime seconds, 0 while the wall clock is unset.
    ///
    /// Written over BLE, read by display code outside the worker context; accessed through the
    /// volatile single-word methods below so a concurrent reader never sees a torn value.
    time_shift: u32,
    pub nodes: [StateNode; NODE_CAP],
    pub channels: [StateChannel; CHANNEL_CAP],
}

impl State {
    pub fn new() -> Self {
        Self {
            time_shift: 0,
            nodes: [StateNode::EMPTY; NODE_CAP],
            channels: [StateChannel {
                temperature: NO_VALUE,
            }; CHANNEL_CAP],
        }
    }

    pub fn time_shift(&self) -> u32 {
        unsafe { ptr::read_volatile(&self.time_shift) }
    }

    pub fn set_time_shift(&mut self, shift: u32) {
        unsafe { ptr::write_volatile(&mut self.time_shift, shift) }
    }

    /// Current UTC seconds, or `None` while no wall clock has been set.
    pub fn wall_clock(&self, uptime_secs: u32) -> Option<u32> {
        match self.time_shift() {
            0 => None,
            shift => Some(uptime_secs.wrapping_add(shift)),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Persistence backend for the configuration region, used by the `KEEP` command.
///
/// Implementations receive the complete serialized region (declaration-order layout, `version`
/// byte first) and must commit it atomically: after a power loss either the previous or the new
/// configuration is read back, never a mix. Wear levelling is the implementation's concern; the
/// hub issues a `keep` only on explicit client request.
pub trait ConfigStore {
    fn keep(&mut self, config: &Config);
}

/// A `ConfigStore` that discards the configuration.
///
/// For hubs without storage hardware; the configuration then only lives until reboot.
pub struct NoStore;

impl ConfigStore for NoStore {
    fn keep(&mut self, _config: &Config) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    #[test]
    fn region_sizes() {
        // These sizes are the external interface of READ/WRITE; a change here breaks deployed
        // clients.
        assert_eq!(mem::size_of::<DaylightTransition>(), 6);
        assert_eq!(mem::size_of::<TimeZone>(), 16);
        assert_eq!(mem::size_of::<ConfigNode>(), 56);
        assert_eq!(mem::size_of::<ConfigChannel>(), 49);
        assert_eq!(mem::size_of::<Config>(), 4 + 16 + 56 * 32 + 49 * 8);
        assert_eq!(mem::size_of::<StateNode>(), 8);
        assert_eq!(mem::size_of::<State>(), 4 + 8 * 32 + 2 * 8);
    }

    #[test]
    fn config_starts_empty() {
        let config = Config::new();
        assert_eq!(config.node_count, 0);
        assert!(config.live_nodes().is_empty());
        assert_eq!(config.nodes[0].channel, CHANNEL_UNASSIGNED);
    }

    #[test]
    fn live_nodes_clamps_bogus_count() {
        let mut config = Config::new();
        config.node_count = 200;
        assert_eq!(config.live_nodes().len(), NODE_CAP);
    }

    #[test]
    fn wall_clock() {
        let mut state = State::new();
        assert_eq!(state.wall_clock(1000), None);
        state.set_time_shift(1_600_000_000);
        assert_eq!(state.wall_clock(1000), Some(1_600_001_000));
    }

    #[test]
    fn names_truncate() {
        let mut node = ConfigNode::EMPTY;
        node.set_name("kitchen");
        assert_eq!(&node.name[..7], b"kitchen");
        assert_eq!(node.name[7], 0);

        let long = "x".repeat(100);
        node.set_name(&long);
        assert_eq!(node.name, [b'x'; NAME_LEN]);
    }

    #[test]
    fn config_roundtrips_through_bytes() {
        let mut config = Config::new();
        config.node_count = 1;
        config.nodes[0].set_addr(crate::frame::NodeAddr {
            high: 0xAAAA,
            low: 0x1111_2222,
        });
        let bytes = config.as_bytes().to_vec();
        let back = Config::read_from(&bytes[..]).unwrap();
        assert_eq!(back.nodes[0].addr_low, 0x1111_2222);
        assert_eq!(back.node_count, 1);
    }
}
