//! The non-realtime half of the hub.
//!
//! While the slot arbiter and link machine race the radio, the `Responder` runs in the worker
//! context and owns everything they must not touch: the configuration and state regions, the
//! chunked endpoint, and the consumer end of the report queue. BLE host callbacks call
//! [`on_write`](Responder::on_write)/[`on_read`](Responder::on_read) directly (they only move
//! bytes in and out of the endpoint buffers); the heavier work (command execution and report
//! aggregation) is driven from the application's work queue via
//! [`process_request`](Responder::process_request) and [`drain_reports`](Responder::drain_reports).

use crate::agg::Aggregator;
use crate::chunk::{AttError, Chunk, ChunkedEndpoint, WriteOutcome};
use crate::cmd;
use crate::config::{ConfConsumer, Config};
use crate::data;
use crate::queue::Consumer;

/// Owner of the hub's mutable state, living in the worker context.
pub struct Responder<C: Config> {
    config: data::Config,
    state: data::State,
    endpoint: ChunkedEndpoint,
    reports: ConfConsumer<C>,
    store: C::Store,
    agg: Aggregator,
}

impl<C: Config> Responder<C> {
    pub fn new(reports: ConfConsumer<C>, store: C::Store) -> Self {
        Self {
            config: data::Config::new(),
            state: data::State::new(),
            endpoint: ChunkedEndpoint::new(),
            reports,
            store,
            agg: Aggregator::new(),
        }
    }

    /// Handles a write to the vendor characteristic (BLE host callback context).
    ///
    /// On [`WriteOutcome::Complete`] the caller must schedule
    /// [`process_request`](Self::process_request) on the work queue; command execution does not
    /// belong in the host's callback.
    pub fn on_write(&mut self, offset: u16, chunk: &[u8]) -> Result<WriteOutcome, AttError> {
        self.endpoint.write_chunk(offset, chunk)
    }

    /// Handles a read from the vendor characteristic (BLE host callback context).
    pub fn on_read(&mut self, offset: u16, avail: usize) -> Result<Chunk, AttError> {
        self.endpoint.read_chunk(offset, avail)
    }

    /// Executes the most recently completed request and publishes its response.
    pub fn process_request(&mut self, uptime_secs: u32) {
        let (request, response) = self.endpoint.exchange();
        let size = cmd::execute(
            request,
            &mut response[..],
            &mut self.config,
            &mut self.state,
            &mut self.store,
            uptime_secs,
        );
        if let Some(size) = size {
            self.endpoint.send_response(size);
        }
    }

    /// Applies all queued mote reports to the state.
    pub fn drain_reports(&mut self, uptime_secs: u32) {
        while let Some(report) = self.reports.consume() {
            self.agg
                .record(&mut self.config, &mut self.state, &report, uptime_secs);
        }
    }

    pub fn config(&self) -> &data::Config {
        &self.config
    }

    pub fn state(&self) -> &data::State {
        &self.state
    }

    /// Reports dropped because the mote table was full.
    pub fn dropped_reports(&self) -> u32 {
        self.agg.dropped_reports()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NoStore;
    use crate::frame::{NodeAddr, Report};
    use crate::queue::{Producer, ReportQueue, SimpleQueue};

    struct TestConfig;

    impl Config for TestConfig {
        type Timer = crate::mock::MockTimer;
        type Radio = crate::mock::MockRadio;
        type Queue = &'static mut SimpleQueue;
        type Store = NoStore;
    }

    fn setup() -> (
        Responder<TestConfig>,
        crate::queue::SimpleProducer<'static>,
    ) {
        let queue = Box::leak(Box::new(SimpleQueue::new()));
        let (p, c) = queue.split();
        (Responder::new(c, NoStore), p)
    }

    /// Reads the whole response back through the characteristic.
    fn read_response(responder: &mut Responder<TestConfig>) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let chunk = responder.on_read(0, 64).unwrap();
            let bytes = chunk.as_bytes();
            if bytes.is_empty() {
                return out;
            }
            out.extend_from_slice(&bytes[1..]);
            if bytes[0] & 0x80 != 0 {
                return out;
            }
        }
    }

    #[test]
    fn uptime_round_trip() {
        let (mut responder, _p) = setup();

        // GET_UPTIME, id 5, in a single chunk.
        assert_eq!(
            responder.on_write(0, &[0xC0 | 5, 1, 0, 5, 0]),
            Ok(WriteOutcome::Complete)
        );

        // Nothing to read until the worker ran.
        assert!(responder.on_read(0, 64).unwrap().as_bytes().is_empty());

        responder.process_request(77);
        let response = read_response(&mut responder);
        assert_eq!(response, &[1, 0, 5, 0, 77, 0, 0, 0]);
    }

    #[test]
    fn reports_flow_into_state() {
        let (mut responder, mut p) = setup();

        p.produce(Report {
            addr: NodeAddr {
                high: 0xAAAA,
                low: 0x1111_2222,
            },
            temperature: 2345,
            voltage: 310,
        })
        .unwrap();

        responder.drain_reports(42);
        assert_eq!(responder.config().node_count, 1);
        assert_eq!(responder.state().nodes[0].temperature, 2345);
        assert_eq!(responder.state().nodes[0].last_update, 42);
    }

    #[test]
    fn config_written_over_ble_affects_aggregation() {
        let (mut responder, mut p) = setup();

        // Enroll one mote.
        p.produce(Report {
            addr: NodeAddr { high: 0, low: 1 },
            temperature: 2000,
            voltage: 300,
        })
        .unwrap();
        responder.drain_reports(0);

        // Assign it to channel 0 by writing the node's channel byte. The channel offset inside
        // the region: header fields (4) + time zone (16) + addr (6) and channel is next.
        let channel_offset = (4 + 16 + 6) as u16;
        let mut request = vec![0xC0 | 1, 3, 0, 1, 0];
        request.extend_from_slice(&channel_offset.to_le_bytes());
        request.push(0);
        let _ = responder.on_write(0, &request).unwrap();
        responder.process_request(0);
        assert_eq!(responder.config().nodes[0].channel, 0);

        // The next report reduces the channel.
        p.produce(Report {
            addr: NodeAddr { high: 0, low: 1 },
            temperature: 2100,
            voltage: 300,
        })
        .unwrap();
        responder.drain_reports(1);
        assert_eq!(responder.state().channels[0].temperature, 2100);
    }
}
