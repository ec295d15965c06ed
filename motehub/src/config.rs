//! Stack configuration trait.

use crate::data::ConfigStore;
use crate::queue::ReportQueue;
use crate::radio::RadioController;
use crate::timeslot::SlotTimer;

/// Type choices of an application using this crate.
///
/// Defines the hardware interface and queue types used throughout the hub. Every application
/// defines one type implementing this trait and wires the matching values together in its init
/// code.
pub trait Config {
    /// The slot-local timer driving extend/stop/deadline compares.
    type Timer: SlotTimer;

    /// The proprietary-mode radio.
    type Radio: RadioController;

    /// The report queue between the slot context and the worker.
    type Queue: ReportQueue;

    /// The persistence backend for the `KEEP` command.
    type Store: ConfigStore;
}

/// Producer half of the configured report queue.
pub type ConfProducer<C> = <<C as Config>::Queue as ReportQueue>::Producer;

/// Consumer half of the configured report queue.
pub type ConfConsumer<C> = <<C as Config>::Queue as ReportQueue>::Consumer;
