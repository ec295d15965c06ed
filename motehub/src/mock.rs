//! Scriptable hardware stand-ins for the host test suite.

use crate::frame::FRAME_LEN;
use crate::radio::{Interrupts, RadioConfig, RadioController, RadioEvent, RadioState, Shorts};
use crate::time::Duration;
use crate::timeslot::{Compare, SlotTimer};

/// A radio whose registers are plain fields.
///
/// Tests poke the event/status fields between `handle` calls to simulate the hardware. `DISABLE`
/// completes immediately by default (`instant_disable`), which matches the sub-microsecond
/// disable times of an idle radio; set it to `false` to simulate a disable that takes a while.
pub struct MockRadio {
    pub powered: bool,
    pub state: RadioState,
    pub shorts: Shorts,
    pub interrupts: Interrupts,
    pub events_end: bool,
    pub events_disabled: bool,
    pub crc_ok: bool,
    pub rx_match_zero: bool,
    pub buf: [u8; FRAME_LEN],
    pub config: Option<RadioConfig>,
    pub configured: bool,
    pub instant_disable: bool,
    pub rx_enables: u32,
    pub tx_enables: u32,
    pub starts: u32,
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            powered: false,
            state: RadioState::Disabled,
            shorts: Shorts::empty(),
            interrupts: Interrupts::empty(),
            events_end: false,
            events_disabled: false,
            crc_ok: false,
            rx_match_zero: false,
            buf: [0; FRAME_LEN],
            config: None,
            configured: false,
            instant_disable: true,
            rx_enables: 0,
            tx_enables: 0,
            starts: 0,
        }
    }
}

impl RadioController for MockRadio {
    fn power_on(&mut self) {
        self.powered = true;
    }

    fn power_off(&mut self) {
        self.powered = false;
        self.state = RadioState::Disabled;
    }

    fn configure(&mut self, config: &RadioConfig) {
        assert_eq!(self.state, RadioState::Disabled, "configured a live radio");
        self.config = Some(*config);
        self.configured = true;
    }

    fn state(&self) -> RadioState {
        self.state
    }

    fn set_shorts(&mut self, shorts: Shorts) {
        self.shorts = shorts;
    }

    fn set_interrupts(&mut self, mask: Interrupts) {
        self.interrupts = mask;
    }

    fn enable_rx(&mut self) {
        self.rx_enables += 1;
        self.state = RadioState::Rx;
    }

    fn enable_tx(&mut self) {
        self.tx_enables += 1;
        self.state = RadioState::Tx;
    }

    fn start(&mut self) {
        self.starts += 1;
    }

    fn disable(&mut self) {
        if self.instant_disable {
            self.state = RadioState::Disabled;
            self.events_disabled = true;
        }
    }

    fn take_event(&mut self, event: RadioEvent) -> bool {
        let flag = match event {
            RadioEvent::End => &mut self.events_end,
            RadioEvent::Disabled => &mut self.events_disabled,
        };
        core::mem::replace(flag, false)
    }

    fn clear_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::End => self.events_end = false,
            RadioEvent::Disabled => self.events_disabled = false,
        }
    }

    fn crc_ok(&self) -> bool {
        self.crc_ok
    }

    fn rx_match_zero(&self) -> bool {
        self.rx_match_zero
    }

    fn packet_buf(&mut self) -> &mut [u8; FRAME_LEN] {
        &mut self.buf
    }
}

/// A slot timer that records what was programmed and fires on command.
pub struct MockTimer {
    pub margin_at: Option<Duration>,
    pub deadline_after: Option<Duration>,
    pub stop_armed: bool,
    pub margin_disabled: bool,
    pub fired_margin: bool,
    pub fired_stop: bool,
    pub fired_deadline: bool,
}

impl MockTimer {
    pub fn new() -> Self {
        Self {
            margin_at: None,
            deadline_after: None,
            stop_armed: false,
            margin_disabled: false,
            fired_margin: false,
            fired_stop: false,
            fired_deadline: false,
        }
    }
}

impl SlotTimer for MockTimer {
    fn set_margin(&mut self, at: Duration) {
        self.margin_at = Some(at);
        self.margin_disabled = false;
    }

    fn arm_stop(&mut self) {
        self.stop_armed = true;
    }

    fn disarm_stop(&mut self) {
        self.stop_armed = false;
        self.fired_stop = false;
    }

    fn set_deadline(&mut self, after: Duration) {
        self.deadline_after = Some(after);
    }

    fn take_fired(&mut self, compare: Compare) -> bool {
        let flag = match compare {
            Compare::Margin => &mut self.fired_margin,
            Compare::Stop => &mut self.fired_stop,
            Compare::Deadline => &mut self.fired_deadline,
        };
        core::mem::replace(flag, false)
    }

    fn disable_margin(&mut self) {
        self.margin_disabled = true;
    }
}
