//! An SPSC queue for mote reports.
//!
//! Validated frames are decoded inside the time-critical slot callback, but everything that
//! follows (mote table scan, channel aggregation) can take its time, so reports cross over to the
//! worker context through a bounded queue.
//!
//! The [`ReportQueue`] trait lets applications substitute their own queue; [`SimpleQueue`] is the
//! provided implementation with the protocol's nominal capacity of [`QUEUE_CAP`] reports. When
//! the queue is full the *newest* report is dropped: a mote whose report is lost will simply
//! retransmit, while the already-queued reports are older and should be processed first.

use crate::frame::Report;
use heapless::{
    consts::U8,
    spsc::{self, MultiCore},
};

/// Capacity of [`SimpleQueue`].
pub const QUEUE_CAP: usize = 8;

/// A splittable SPSC queue for reports.
pub trait ReportQueue {
    /// Producing (slot context) half of the queue.
    type Producer: Producer;

    /// Consuming (worker context) half of the queue.
    type Consumer: Consumer;

    /// Splits the queue into its producing and consuming ends.
    ///
    /// This takes `self` by value; implementations on `&'a mut QueueType` can hand out producer
    /// and consumer halves that borrow the underlying storage for `'a`.
    fn split(self) -> (Self::Producer, Self::Consumer);
}

/// The producing half of a report queue.
pub trait Producer {
    /// Enqueues a report.
    ///
    /// Returns the report back when the queue is full; the caller decides whether to count or log
    /// the loss (it may run in interrupt context, so it must not block).
    fn produce(&mut self, report: Report) -> Result<(), Report>;
}

/// The consuming half of a report queue.
pub trait Consumer {
    /// Returns whether a report is waiting.
    fn has_reports(&self) -> bool;

    /// Dequeues the oldest report, if any.
    fn consume(&mut self) -> Option<Report>;
}

/// A report queue holding up to [`QUEUE_CAP`] reports.
///
/// Built on `heapless::spsc` with `u8` indices, which is compatible with thumbv6 cores that lack
/// the atomics larger queues may want.
pub struct SimpleQueue {
    inner: spsc::Queue<Report, U8, u8, MultiCore>,
}

impl SimpleQueue {
    /// Creates a new, empty queue.
    pub const fn new() -> Self {
        Self {
            inner: spsc::Queue(heapless::i::Queue::u8()),
        }
    }
}

impl<'a> ReportQueue for &'a mut SimpleQueue {
    type Producer = SimpleProducer<'a>;

    type Consumer = SimpleConsumer<'a>;

    fn split(self) -> (Self::Producer, Self::Consumer) {
        let (p, c) = self.inner.split();
        (SimpleProducer { inner: p }, SimpleConsumer { inner: c })
    }
}

/// Producer half returned by `SimpleQueue::split`.
pub struct SimpleProducer<'a> {
    inner: spsc::Producer<'a, Report, U8, u8, MultiCore>,
}

impl<'a> Producer for SimpleProducer<'a> {
    fn produce(&mut self, report: Report) -> Result<(), Report> {
        self.inner.enqueue(report)
    }
}

/// Consumer half returned by `SimpleQueue::split`.
pub struct SimpleConsumer<'a> {
    inner: spsc::Consumer<'a, Report, U8, u8, MultiCore>,
}

impl<'a> Consumer for SimpleConsumer<'a> {
    fn has_reports(&self) -> bool {
        self.inner.ready()
    }

    fn consume(&mut self) -> Option<Report> {
        self.inner.dequeue()
    }
}

/// Runs the report queue testsuite against the given `ReportQueue`.
///
/// Useful when implementing a custom queue: call this from a `#[test]` and it will panic on any
/// misbehavior. The passed queue must be empty and must have space for at least one report.
pub fn run_tests(queue: impl ReportQueue) {
    use crate::frame::NodeAddr;

    fn report(n: u32) -> Report {
        Report {
            addr: NodeAddr { high: 0, low: n },
            temperature: n as i16,
            voltage: 0,
        }
    }

    let (mut p, mut c) = queue.split();

    assert!(!c.has_reports(), "empty queue `has_reports()` returned true");
    assert!(
        c.consume().is_none(),
        "empty queue `consume()` returned a report"
    );

    p.produce(report(1)).expect("enqueuing into empty queue failed");
    assert!(c.has_reports(), "`has_reports()` false after produce");

    // Fill the queue up; whatever the capacity is, production must eventually fail and hand the
    // report back unchanged.
    let mut stored = 1;
    let rejected = loop {
        match p.produce(report(stored + 1)) {
            Ok(()) => stored += 1,
            Err(r) => break r,
        }
        assert!(stored < 10_000, "queue does not appear to be bounded");
    };
    assert_eq!(rejected, report(stored + 1), "rejected report was altered");

    // Drain it; order must be preserved.
    for n in 1..=stored {
        assert_eq!(c.consume(), Some(report(n)), "report order not preserved");
    }
    assert!(!c.has_reports());
    assert!(c.consume().is_none());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_queue() {
        run_tests(&mut SimpleQueue::new());
    }

    #[test]
    fn capacity() {
        let mut queue = SimpleQueue::new();
        let (mut p, _c) = (&mut queue).split();
        let report = Report {
            addr: crate::frame::NodeAddr { high: 0, low: 0 },
            temperature: 0,
            voltage: 0,
        };
        for _ in 0..QUEUE_CAP {
            p.produce(report).unwrap();
        }
        assert!(p.produce(report).is_err());
    }
}
