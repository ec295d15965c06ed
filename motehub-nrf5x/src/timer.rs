//! The slot-local timer.
//!
//! The host scheduler starts TIMER0 from zero when a slot begins and hands it over running at
//! 16 MHz (prescaler 0); it cannot be paused or restarted from here. This driver only programs
//! compare channels on it:
//!
//! * CC0: the extend margin, an absolute in-slot time.
//! * CC1: the clean-stop trigger, armed a few ticks ahead of the live counter.
//! * CC2: the in-slot deadline of the link state machine.
//! * CC3: scratch channel for capturing the counter; no interrupt.

use crate::pac::TIMER0;
use motehub::time::Duration;
use motehub::timeslot::{Compare, SlotTimer};

const TICKS_PER_US: u32 = 16;

/// How far ahead of the captured counter the stop compare is placed.
const STOP_DELTA_TICKS: u32 = 5;

fn index(compare: Compare) -> usize {
    match compare {
        Compare::Margin => 0,
        Compare::Stop => 1,
        Compare::Deadline => 2,
    }
}

/// [`SlotTimer`] over the scheduler-owned TIMER0.
pub struct SlotTimer0 {
    timer: TIMER0,
}

impl SlotTimer0 {
    pub fn new(timer: TIMER0) -> Self {
        Self { timer }
    }

    /// Captures the live counter value via the scratch channel.
    fn capture(&self) -> u32 {
        self.timer.tasks_capture[3].write(|w| unsafe { w.bits(1) });
        self.timer.cc[3].read().bits()
    }
}

impl SlotTimer for SlotTimer0 {
    fn set_margin(&mut self, at: Duration) {
        self.timer.events_compare[0].reset();
        self.timer.cc[0].write(|w| unsafe { w.bits(at.as_micros() * TICKS_PER_US) });
        self.timer.intenset.write(|w| w.compare0().set());
    }

    fn arm_stop(&mut self) {
        self.timer.events_compare[1].reset();

        // The counter keeps running while CC1 is being written. If it crossed the programmed
        // value in the meantime the match was missed for a full wrap, so capture again and
        // retry until the write demonstrably landed ahead of the counter.
        let mut counter = self.capture();
        loop {
            self.timer.cc[1]
                .write(|w| unsafe { w.bits(counter.wrapping_add(STOP_DELTA_TICKS)) });
            let now = self.capture();
            if now.wrapping_sub(counter) <= 1 {
                break;
            }
            counter = now;
        }

        self.timer.intenset.write(|w| w.compare1().set());
    }

    fn disarm_stop(&mut self) {
        self.timer.intenclr.write(|w| w.compare1().clear());
        self.timer.events_compare[1].reset();
    }

    fn set_deadline(&mut self, after: Duration) {
        self.timer.events_compare[2].reset();
        let at = self
            .capture()
            .wrapping_add(after.as_micros() * TICKS_PER_US);
        self.timer.cc[2].write(|w| unsafe { w.bits(at) });
        self.timer.intenset.write(|w| w.compare2().set());
    }

    fn take_fired(&mut self, compare: Compare) -> bool {
        let event = &self.timer.events_compare[index(compare)];
        if event.read().bits() != 0 {
            event.reset();
            true
        } else {
            false
        }
    }

    fn disable_margin(&mut self) {
        self.timer.intenclr.write(|w| w.compare0().clear());
    }
}
