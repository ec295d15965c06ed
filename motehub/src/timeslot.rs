//! The radio time-slot arbiter.
//!
//! The BLE host scheduler owns the radio; this module negotiates bounded exclusive intervals
//! ("slots") in which the mote protocol may use it. The arbiter consumes the scheduler's signals,
//! drives the [`link`](crate::link) state machine with typed events, and answers with the action
//! the scheduler should take: nothing, extend the running slot, or end it and place the next one.
//!
//! The slot length is derived from the worst-case single RX/ACK exchange:
//!
//! ```notrust
//! RX ramp up               140 µs
//! report frame on air      544 µs   (136 bits at 250 kbit/s)
//! RX disable                 4 µs
//! frame processing         100 µs
//! TX ramp up               140 µs
//! ACK frame on air         544 µs
//! TX disable                15 µs
//!                         ------
//!                         1487 µs  → 1500 µs + 200 µs margin
//! ```
//!
//! While motes keep reporting, the arbiter extends the slot one [`T_SLOT`] at a time from the
//! margin compare. When an extension is denied (BLE needs the radio), the slot winds down and the
//! next one is requested [`ADV_JUMP`] after the current slot's start, hopping over the BLE
//! advertising event that caused the denial.
//!
//! All of this runs inside the scheduler's high-priority signal callback and must neither block
//! nor allocate. Re-requesting a denied slot goes through [`Action::Resubmit`] so the actual
//! scheduler call happens from a work-queue context.

use crate::config::{Config, ConfProducer};
use crate::link::{Event, Request, SensorLink};
use crate::time::Duration;

/// Length of a slot: the RX/ACK exchange budget plus [`MARGIN`].
pub const T_SLOT: Duration = Duration::from_micros(1700);

/// Headroom before the end of a slot used to extend it, or to wind down in time.
pub const MARGIN: Duration = Duration::from_micros(200);

/// Distance from the current slot's start to the next slot, leaving room for one BLE
/// advertising event (6000 µs slot and a third of slack).
pub const ADV_JUMP: Duration = Duration::from_micros(8000);

/// Timeout for the "earliest possible" slot request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// A signal from the host scheduler's slot session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A slot begins now; the slot timer was zeroed.
    Start,
    /// The slot-local timer raised an interrupt (any compare channel).
    Timer,
    /// The radio raised an interrupt during the slot.
    Radio,
    /// A previously returned `Extend` was granted.
    ExtendSucceeded,
    /// A previously returned `Extend` was denied; the slot is about to end.
    ExtendFailed,
    /// The pending slot request was blocked by higher-priority activity.
    Blocked,
    /// The pending slot request was cancelled by the scheduler.
    Cancelled,
}

/// The arbiter's answer to a signal, to be returned to the host scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum Action {
    /// Keep the slot as is.
    None,
    /// Extend the running slot by `length`.
    Extend { length: Duration },
    /// End the slot and schedule the next one `distance` after this slot's start.
    Request { distance: Duration },
    /// Submit a fresh earliest-possible request from the work queue.
    ///
    /// Never turned into a scheduler call directly: `Blocked`/`Cancelled` arrive in a context
    /// where re-requesting synchronously is not allowed.
    Resubmit,
}

/// Compare channels of the slot-local timer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Compare {
    /// CC0: fires [`MARGIN`] before the end of the slot ("extend now").
    Margin,
    /// CC1: fires a few ticks after being armed ("end the slot cleanly").
    Stop,
    /// CC2: an in-slot deadline requested by the state machine.
    Deadline,
}

/// The timer that accompanies each slot.
///
/// The host scheduler starts this timer at zero when a slot begins; all compare values are
/// relative to the slot start. Implementations multiplex one hardware timer interrupt, so the
/// arbiter asks per channel which compare actually fired.
pub trait SlotTimer {
    /// Programs the margin compare at the absolute in-slot time `at` and enables its interrupt.
    fn set_margin(&mut self, at: Duration);

    /// Arms the stop compare a few ticks from *now*.
    ///
    /// The timer cannot be paused, so implementations must capture the live counter, program
    /// `counter + 5` ticks, re-capture, and retry if the counter crossed the programmed value in
    /// the meantime. Skipping the retry loses the compare match entirely and the slot would
    /// never end.
    fn arm_stop(&mut self);

    /// Programs the deadline compare `after` from now and enables its interrupt.
    fn set_deadline(&mut self, after: Duration);

    /// Disables the stop compare and drops a pending stop event.
    ///
    /// Called at slot start: a stop armed near the end of the previous slot would otherwise
    /// match again early in the new one and end it immediately.
    fn disarm_stop(&mut self);

    /// If `compare` has fired since the last call, acknowledges it and returns `true`.
    fn take_fired(&mut self, compare: Compare) -> bool;

    /// Disables the margin interrupt (the slot will not be extended anymore).
    fn disable_margin(&mut self);
}

/// Arbitrates slot signals between the host scheduler and the link state machine.
pub struct SlotArbiter<C: Config> {
    timer: C::Timer,
    link: SensorLink,
    /// Current total slot length; grows by [`T_SLOT`] with every successful extension.
    end_time: Duration,
}

impl<C: Config> SlotArbiter<C> {
    pub fn new(timer: C::Timer, link: SensorLink) -> Self {
        Self {
            timer,
            link,
            end_time: T_SLOT,
        }
    }

    /// Handles one scheduler signal.
    ///
    /// Runs in the scheduler's signal context. `radio` and `reports` are only touched through
    /// the link state machine.
    pub fn signal(
        &mut self,
        signal: Signal,
        radio: &mut C::Radio,
        reports: &mut ConfProducer<C>,
    ) -> Action {
        match signal {
            Signal::Start => {
                self.end_time = T_SLOT;
                self.timer.disarm_stop();
                self.timer.set_margin(self.end_time - MARGIN);
                self.dispatch(Event::Start, false, radio, reports)
            }

            Signal::Timer => {
                if self.timer.take_fired(Compare::Stop) {
                    return self.next_slot();
                }
                if self.timer.take_fired(Compare::Margin) {
                    return Action::Extend { length: T_SLOT };
                }
                if self.timer.take_fired(Compare::Deadline) {
                    return self.dispatch(Event::Timer, true, radio, reports);
                }
                Action::None
            }

            Signal::Radio => self.dispatch(Event::Radio, true, radio, reports),

            Signal::ExtendSucceeded => {
                self.end_time += T_SLOT;
                self.timer.set_margin(self.end_time - MARGIN);
                Action::None
            }

            Signal::ExtendFailed => {
                self.timer.disable_margin();
                self.dispatch(Event::End, false, radio, reports)
            }

            // Must not call back into the scheduler from its own signal; the work queue
            // re-submits the earliest request.
            Signal::Blocked | Signal::Cancelled => Action::Resubmit,
        }
    }

    /// Forwards an event to the link and maps its request onto a scheduler action.
    ///
    /// `direct_request` is true in the radio and deadline contexts, where the scheduler accepts
    /// an `ACTION_REQUEST` return directly. Elsewhere a finished link instead arms the stop
    /// compare, and the request happens when it fires.
    fn dispatch(
        &mut self,
        event: Event,
        direct_request: bool,
        radio: &mut C::Radio,
        reports: &mut ConfProducer<C>,
    ) -> Action {
        match self.link.handle(event, radio, reports) {
            Request::Continue => Action::None,
            Request::Timer(delay) => {
                self.timer.set_deadline(delay);
                Action::None
            }
            Request::End => {
                if direct_request {
                    self.next_slot()
                } else {
                    self.timer.arm_stop();
                    Action::None
                }
            }
        }
    }

    fn next_slot(&self) -> Action {
        debug!("slot over after {}, next in {}", self.end_time, ADV_JUMP);
        Action::Request {
            distance: self.end_time + ADV_JUMP,
        }
    }
}
