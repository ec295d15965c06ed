//! The mote-protocol radio state machine.
//!
//! A coroutine in the shape of an explicit resume-point enum. [`SensorLink::handle`] is entered
//! once per asynchronous event
//! (slot start, slot end, radio interrupt, deadline timer), advances the radio by at most one
//! step, and suspends by remembering where to continue. All events arrive serialized from the
//! slot arbiter, so the machine never runs concurrently with itself.
//!
//! One full cycle inside a slot:
//!
//! ```notrust
//! power on → [drain stale radio] → configure → RX ─────────────┐
//!    ▲                                          │ valid frame  │ CRC/address
//!    │                                          ▼              │ mismatch:
//!    │                                   disable RX,           │ restart RX
//!    │                                   queue report          │
//!    │                                          │              │
//!    │                                   50 µs turnaround      │
//!    │                                          ▼              │
//!    └───────────────────────────────── TX ACK ◄───────────────┘
//! ```
//!
//! A slot `End` can interrupt any suspension; every terminal path drives the radio to `Disabled`
//! and powers it off before [`Request::End`] hands the slot back, so the BLE host never takes
//! over a half-configured radio.

use crate::bytes::{ByteReader, ByteWriter, FromBytes, ToBytes};
use crate::frame::{Ack, NodeAddr, Report};
use crate::queue::Producer;
use crate::radio::{Interrupts, RadioConfig, RadioController, RadioEvent, RadioState, Shorts};
use crate::time::Duration;
use crate::utils::HexSlice;

/// Delay between disabling RX and ramping up the ACK transmission.
///
/// The mote needs this long to switch its own radio from TX to RX; an ACK sent earlier is lost.
const PEER_SWITCH_DELAY: Duration = Duration::from_micros(50);

/// An asynchronous event delivered to the state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    /// A slot was granted; the machine owns the radio from now on.
    Start,
    /// The slot is ending; wind down and release the radio.
    End,
    /// The radio peripheral raised an interrupt.
    Radio,
    /// A previously requested in-slot deadline was reached.
    Timer,
}

/// What the state machine needs from the slot arbiter after handling an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum Request {
    /// Nothing; wait for the next event.
    Continue,
    /// The radio is powered off, the slot can end.
    End,
    /// Deliver [`Event::Timer`] after the given in-slot delay.
    Timer(Duration),
}

/// Resume points. Each variant names the event the machine is suspended on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Wait {
    /// No slot active; the next `Start` begins from scratch.
    Idle,
    /// Disabling a radio the BLE host left enabled; waiting for `DISABLED`.
    InitDisable,
    /// Receiver running; waiting for a frame (`END`).
    RxEnd,
    /// Receiver disabling after a valid frame; waiting for `DISABLED`.
    RxDisable,
    /// Waiting out the mote's TX→RX turnaround.
    PeerSwitch,
    /// ACK transmission running; waiting for `DISABLED` (via the END→DISABLE short).
    TxDisable,
    /// Slot teardown; waiting for `DISABLED` before powering off.
    FinalDisable,
}

/// The resumable RX→ACK state machine.
///
/// Owns no hardware: the radio and the report queue producer are passed into every
/// [`handle`](Self::handle) call by the arbiter, which also guarantees the calls never overlap.
pub struct SensorLink {
    wait: Wait,
    config: RadioConfig,
    /// Address of the mote whose report was just queued; the ACK echoes it.
    peer: Option<NodeAddr>,
    dropped_reports: u32,
}

impl SensorLink {
    pub fn new(config: RadioConfig) -> Self {
        Self {
            wait: Wait::Idle,
            config,
            peer: None,
            dropped_reports: 0,
        }
    }

    /// Number of valid frames dropped because the report queue was full.
    pub fn dropped_reports(&self) -> u32 {
        self.dropped_reports
    }

    /// Advances the machine by one event.
    ///
    /// Runs in the slot signal context: no blocking, no allocation, a bounded number of register
    /// accesses. A resume that finds none of the expected event flags set is spurious and returns
    /// [`Request::Continue`] without advancing.
    pub fn handle<R: RadioController>(
        &mut self,
        event: Event,
        radio: &mut R,
        reports: &mut impl Producer,
    ) -> Request {
        trace!("link: {:?} in {:?}", event, self.wait);

        if event == Event::Start {
            return self.start(radio);
        }

        match self.wait {
            Wait::Idle => Request::Continue,

            Wait::InitDisable => match event {
                Event::End => self.final_disable(),
                _ => {
                    if !radio.take_event(RadioEvent::Disabled) {
                        return Request::Continue;
                    }
                    radio.configure(&self.config);
                    self.arm_rx(radio)
                }
            },

            Wait::RxEnd => match event {
                Event::End => {
                    // Receiver may be mid-frame; force it down and wait for the DISABLED event.
                    radio.clear_event(RadioEvent::Disabled);
                    radio.set_shorts(Shorts::empty());
                    radio.set_interrupts(Interrupts::DISABLED);
                    radio.disable();
                    self.final_disable()
                }
                _ => {
                    if !radio.take_event(RadioEvent::End) {
                        return Request::Continue;
                    }
                    if !radio.crc_ok() || !radio.rx_match_zero() {
                        // Bad frame: resume receiving in place, the ramp-up is still valid.
                        radio.start();
                        return Request::Continue;
                    }
                    self.frame_received(radio, reports)
                }
            },

            Wait::RxDisable => match event {
                Event::End => self.final_disable(),
                _ => {
                    if !radio.take_event(RadioEvent::Disabled) {
                        return Request::Continue;
                    }
                    self.wait = Wait::PeerSwitch;
                    Request::Timer(PEER_SWITCH_DELAY)
                }
            },

            Wait::PeerSwitch => match event {
                // The radio is already disabled here, no teardown needed.
                Event::End => self.power_off(radio),
                Event::Timer => self.send_ack(radio),
                _ => Request::Continue,
            },

            Wait::TxDisable => match event {
                Event::End => {
                    if radio.state() != RadioState::Disabled {
                        radio.clear_event(RadioEvent::Disabled);
                        radio.set_shorts(Shorts::empty());
                        radio.disable();
                        if radio.state() != RadioState::Disabled {
                            return self.final_disable();
                        }
                    }
                    self.power_off(radio)
                }
                _ => {
                    if !radio.take_event(RadioEvent::Disabled) {
                        return Request::Continue;
                    }
                    // ACK is out; start over with the next reception, the radio configuration
                    // is still in place.
                    self.arm_rx(radio)
                }
            },

            Wait::FinalDisable => {
                if !radio.take_event(RadioEvent::Disabled) {
                    return Request::Continue;
                }
                self.power_off(radio)
            }
        }
    }

    /// `Start` entry: take the radio over, regardless of what it was doing.
    fn start<R: RadioController>(&mut self, radio: &mut R) -> Request {
        radio.power_on();
        radio.set_interrupts(Interrupts::empty());

        // The BLE host may have handed us an enabled radio; drain it first.
        if radio.state() != RadioState::Disabled {
            radio.clear_event(RadioEvent::Disabled);
            radio.set_interrupts(Interrupts::DISABLED);
            radio.set_shorts(Shorts::empty());
            radio.disable();
            if radio.state() != RadioState::Disabled {
                self.wait = Wait::InitDisable;
                return Request::Continue;
            }
        }

        radio.configure(&self.config);
        self.arm_rx(radio)
    }

    /// Arms reception: READY→START short, interrupt on frame end.
    fn arm_rx<R: RadioController>(&mut self, radio: &mut R) -> Request {
        radio.clear_event(RadioEvent::End);
        radio.set_shorts(Shorts::READY_START);
        radio.set_interrupts(Interrupts::END);
        radio.enable_rx();
        self.wait = Wait::RxEnd;
        Request::Continue
    }

    /// A CRC-clean, address-matched frame is in the packet buffer.
    fn frame_received<R: RadioController>(
        &mut self,
        radio: &mut R,
        reports: &mut impl Producer,
    ) -> Request {
        radio.set_shorts(Shorts::empty());
        radio.set_interrupts(Interrupts::DISABLED);
        radio.disable();

        // Decode and queue before suspending; the buffer stays untouched until the ACK is
        // encoded into it.
        let buf = radio.packet_buf();
        trace!("frame: {:?}", HexSlice(&buf[..]));
        let report = Report::from_bytes(&mut ByteReader::new(&buf[..])).unwrap(); // buffer is FRAME_LEN
        debug!("report from {:?}: {}", report.addr, report.temperature);
        self.peer = Some(report.addr);
        if reports.produce(report).is_err() {
            self.dropped_reports = self.dropped_reports.wrapping_add(1);
            warn!("report queue full, dropping frame from {:?}", report.addr);
        }

        self.wait = Wait::RxDisable;
        Request::Continue
    }

    /// Turnaround elapsed: transmit the ACK out of the shared packet buffer.
    fn send_ack<R: RadioController>(&mut self, radio: &mut R) -> Request {
        let peer = match self.peer.take() {
            Some(addr) => addr,
            None => return Request::Continue,
        };

        Ack { addr: peer }
            .to_bytes(&mut ByteWriter::new(&mut radio.packet_buf()[..]))
            .unwrap(); // buffer is FRAME_LEN

        radio.set_shorts(Shorts::READY_START | Shorts::END_DISABLE);
        radio.set_interrupts(Interrupts::DISABLED);
        radio.enable_tx();
        self.wait = Wait::TxDisable;
        Request::Continue
    }

    /// Suspends until the pending DISABLE finishes, then powers off.
    fn final_disable(&mut self) -> Request {
        self.wait = Wait::FinalDisable;
        Request::Continue
    }

    /// Releases the radio and reports the slot as done.
    fn power_off<R: RadioController>(&mut self, radio: &mut R) -> Request {
        radio.power_off();
        self.wait = Wait::Idle;
        trace!("link: radio released");
        Request::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRadio;
    use crate::queue::{Consumer, ReportQueue, SimpleQueue};

    const REPORT_FRAME: [u8; 10] = [
        0x22, 0x22, 0x11, 0x11, 0xAA, 0xAA, 0x29, 0x09, 0x36, 0x01,
    ];

    fn assert_released(radio: &MockRadio) {
        assert!(!radio.powered);
        assert_eq!(radio.state, RadioState::Disabled);
    }

    #[test]
    fn full_rx_ack_cycle() {
        let mut radio = MockRadio::new();
        let mut queue = SimpleQueue::new();
        let (mut p, mut c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        assert_eq!(link.handle(Event::Start, &mut radio, &mut p), Request::Continue);
        assert!(radio.powered);
        assert!(radio.configured);
        assert_eq!(radio.shorts, Shorts::READY_START);
        assert_eq!(radio.interrupts, Interrupts::END);

        // A valid frame arrives.
        radio.buf = REPORT_FRAME;
        radio.events_end = true;
        radio.crc_ok = true;
        radio.rx_match_zero = true;
        assert_eq!(link.handle(Event::Radio, &mut radio, &mut p), Request::Continue);

        let report = c.consume().expect("report not queued");
        assert_eq!(report.addr.high, 0xAAAA);
        assert_eq!(report.temperature, 2345);

        // The mock completes DISABLE immediately; the machine asks for the turnaround delay.
        assert_eq!(
            link.handle(Event::Radio, &mut radio, &mut p),
            Request::Timer(Duration::from_micros(50))
        );

        // Turnaround over: ACK goes out of the same buffer.
        assert_eq!(link.handle(Event::Timer, &mut radio, &mut p), Request::Continue);
        assert_eq!(
            radio.buf,
            [0x22, 0x22, 0x11, 0x11, 0xAA, 0xAA, 0x00, 0x00, 0x00, 0x80]
        );
        assert_eq!(radio.shorts, Shorts::READY_START | Shorts::END_DISABLE);
        assert_eq!(radio.tx_enables, 1);

        // TX finished (END→DISABLE short): next cycle arms RX again.
        radio.state = RadioState::Disabled;
        radio.events_disabled = true;
        assert_eq!(link.handle(Event::Radio, &mut radio, &mut p), Request::Continue);
        assert_eq!(radio.shorts, Shorts::READY_START);
        assert_eq!(radio.interrupts, Interrupts::END);
        assert_eq!(radio.rx_enables, 2);
    }

    #[test]
    fn bad_crc_restarts_reception() {
        let mut radio = MockRadio::new();
        let mut queue = SimpleQueue::new();
        let (mut p, mut c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        let _ = link.handle(Event::Start, &mut radio, &mut p);
        radio.events_end = true;
        radio.crc_ok = false;
        radio.rx_match_zero = true;
        assert_eq!(link.handle(Event::Radio, &mut radio, &mut p), Request::Continue);
        assert_eq!(radio.starts, 1, "reception not restarted");
        assert!(c.consume().is_none(), "bad frame must not be queued");

        // Same for a frame that matched the wrong logical address.
        radio.events_end = true;
        radio.crc_ok = true;
        radio.rx_match_zero = false;
        assert_eq!(link.handle(Event::Radio, &mut radio, &mut p), Request::Continue);
        assert_eq!(radio.starts, 2);
        assert!(c.consume().is_none());
    }

    #[test]
    fn end_during_rx_releases_radio() {
        let mut radio = MockRadio::new();
        let mut queue = SimpleQueue::new();
        let (mut p, _c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        let _ = link.handle(Event::Start, &mut radio, &mut p);
        // Slot ends before any frame; teardown waits for the disable to complete.
        assert_eq!(link.handle(Event::End, &mut radio, &mut p), Request::Continue);
        assert_eq!(link.handle(Event::Radio, &mut radio, &mut p), Request::End);
        assert_released(&radio);

        // The next slot starts cleanly from scratch.
        assert_eq!(link.handle(Event::Start, &mut radio, &mut p), Request::Continue);
        assert!(radio.powered);
        assert_eq!(radio.interrupts, Interrupts::END);
    }

    #[test]
    fn end_during_peer_switch_powers_off_directly() {
        let mut radio = MockRadio::new();
        let mut queue = SimpleQueue::new();
        let (mut p, _c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        let _ = link.handle(Event::Start, &mut radio, &mut p);
        radio.buf = REPORT_FRAME;
        radio.events_end = true;
        radio.crc_ok = true;
        radio.rx_match_zero = true;
        let _ = link.handle(Event::Radio, &mut radio, &mut p);
        let _ = link.handle(Event::Radio, &mut radio, &mut p); // → Timer request

        // Radio is already disabled while waiting for the mote to turn around.
        assert_eq!(link.handle(Event::End, &mut radio, &mut p), Request::End);
        assert_released(&radio);
    }

    #[test]
    fn end_during_tx_releases_radio() {
        let mut radio = MockRadio::new();
        let mut queue = SimpleQueue::new();
        let (mut p, _c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        let _ = link.handle(Event::Start, &mut radio, &mut p);
        radio.buf = REPORT_FRAME;
        radio.events_end = true;
        radio.crc_ok = true;
        radio.rx_match_zero = true;
        let _ = link.handle(Event::Radio, &mut radio, &mut p);
        let _ = link.handle(Event::Radio, &mut radio, &mut p);
        let _ = link.handle(Event::Timer, &mut radio, &mut p); // TX running

        assert_eq!(radio.state, RadioState::Tx);
        // End mid-transmission: the mock completes the forced disable at once.
        assert_eq!(link.handle(Event::End, &mut radio, &mut p), Request::End);
        assert_released(&radio);
    }

    #[test]
    fn stale_radio_is_drained_before_config() {
        let mut radio = MockRadio::new();
        // The BLE host left the receiver running and disables take a while.
        radio.state = RadioState::Rx;
        radio.instant_disable = false;

        let mut queue = SimpleQueue::new();
        let (mut p, _c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        assert_eq!(link.handle(Event::Start, &mut radio, &mut p), Request::Continue);
        assert!(!radio.configured, "configured while radio still enabled");

        // Disable completes.
        radio.state = RadioState::Disabled;
        radio.events_disabled = true;
        assert_eq!(link.handle(Event::Radio, &mut radio, &mut p), Request::Continue);
        assert!(radio.configured);
        assert_eq!(radio.rx_enables, 1);
    }

    #[test]
    fn spurious_resume_does_not_advance() {
        let mut radio = MockRadio::new();
        let mut queue = SimpleQueue::new();
        let (mut p, mut c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        let _ = link.handle(Event::Start, &mut radio, &mut p);
        // Radio interrupt with no END event latched.
        assert_eq!(link.handle(Event::Radio, &mut radio, &mut p), Request::Continue);
        assert_eq!(link.handle(Event::Timer, &mut radio, &mut p), Request::Continue);
        assert_eq!(radio.rx_enables, 1, "machine advanced on a spurious resume");
        assert!(c.consume().is_none());
    }

    #[test]
    fn queue_overflow_is_counted() {
        let mut radio = MockRadio::new();
        let mut queue = SimpleQueue::new();
        let (mut p, _c) = (&mut queue).split();
        let mut link = SensorLink::new(RadioConfig::default());

        let _ = link.handle(Event::Start, &mut radio, &mut p);
        // 8 reports fit, the 9th is dropped.
        for _ in 0..9 {
            radio.buf = REPORT_FRAME;
            radio.events_end = true;
            radio.crc_ok = true;
            radio.rx_match_zero = true;
            let _ = link.handle(Event::Radio, &mut radio, &mut p); // frame
            let _ = link.handle(Event::Radio, &mut radio, &mut p); // disable done
            let _ = link.handle(Event::Timer, &mut radio, &mut p); // ACK out
            radio.state = RadioState::Disabled;
            radio.events_disabled = true;
            let _ = link.handle(Event::Radio, &mut radio, &mut p); // next RX
        }
        assert_eq!(link.dropped_reports(), 1);
    }
}
