//! Folding mote reports into the hub's state.
//!
//! Runs in the worker context, never in the slot callback: reports arrive through the
//! [`queue`](crate::queue) and are applied here, one at a time. This module is the only writer of
//! [`State`] and the only code that appends to the mote table.
//!
//! Unknown motes enroll themselves: the first report from a new address claims the next table
//! slot with no channel and a placeholder name, so the user only has to name and assign it over
//! BLE instead of typing a 48-bit address. When the table is full, reports from unknown motes
//! are counted and dropped.

use crate::data::{
    ChannelFunction, Config, State, StateNode, CHANNEL_CAP, CHANNEL_UNASSIGNED, NODE_CAP, NO_VALUE,
};
use crate::frame::Report;

/// Name given to a self-enrolled mote until the user assigns one.
const DEFAULT_NAME: &str = "[no name]";

/// Applies reports to the configuration and state regions.
pub struct Aggregator {
    dropped_reports: u32,
}

impl Aggregator {
    pub fn new() -> Self {
        Self { dropped_reports: 0 }
    }

    /// Number of reports dropped because the mote table was full.
    pub fn dropped_reports(&self) -> u32 {
        self.dropped_reports
    }

    /// Records one report: updates the mote's state and re-reduces its channel.
    pub fn record(
        &mut self,
        config: &mut Config,
        state: &mut State,
        report: &Report,
        uptime_secs: u32,
    ) {
        let index = config
            .live_nodes()
            .iter()
            .position(|node| node.addr() == report.addr);

        let index = match index {
            Some(index) => index,
            None => match self.enroll(config, state, report) {
                Some(index) => index,
                None => {
                    self.dropped_reports = self.dropped_reports.wrapping_add(1);
                    warn!("mote table full, dropping report from {:?}", report.addr);
                    return;
                }
            },
        };

        state.nodes[index] = StateNode {
            last_update: uptime_secs,
            temperature: report.temperature,
            voltage: report.voltage,
        };

        let channel = config.nodes[index].channel;
        if (channel as usize) < CHANNEL_CAP {
            recompute_channel(config, state, channel);
        }
    }

    /// Appends a new mote to the table, or returns `None` when it is full.
    fn enroll(&mut self, config: &mut Config, state: &mut State, report: &Report) -> Option<usize> {
        let index = config.live_nodes().len();
        if index >= NODE_CAP {
            return None;
        }

        let node = &mut config.nodes[index];
        node.set_addr(report.addr);
        node.channel = CHANNEL_UNASSIGNED;
        node.set_name(DEFAULT_NAME);
        state.nodes[index] = StateNode::EMPTY;
        config.node_count = index as u8 + 1;
        debug!("enrolled mote {:?} as #{}", report.addr, index);
        Some(index)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-reduces one channel over all motes assigned to it.
///
/// A channel with no motes, or with any assigned mote that has no measurement yet, reduces to
/// [`NO_VALUE`]: a partial minimum or average would look like a valid reading and mislead
/// whoever is watching the channel.
pub fn recompute_channel(config: &Config, state: &mut State, channel: u8) {
    let index = channel as usize;
    if index >= CHANNEL_CAP {
        return;
    }

    let mut sum: i32 = 0;
    let mut count: i32 = 0;
    let mut min = i16::max_value();
    let mut max = i16::min_value();
    let mut missing = false;

    for (node, node_state) in config.live_nodes().iter().zip(state.nodes.iter()) {
        if node.channel != channel {
            continue;
        }
        if node_state.temperature == NO_VALUE {
            missing = true;
            break;
        }
        sum += i32::from(node_state.temperature);
        count += 1;
        min = min.min(node_state.temperature);
        max = max.max(node_state.temperature);
    }

    let value = if missing || count == 0 {
        NO_VALUE
    } else {
        match config.channels[index].function() {
            ChannelFunction::Min => min,
            ChannelFunction::Max => max,
            // Round to nearest; 32-bit accumulator so 32 full-scale readings cannot overflow.
            ChannelFunction::Avg => ((sum + count / 2) / count) as i16,
            ChannelFunction::Unknown(_) => NO_VALUE,
        }
    };

    state.channels[index].temperature = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::NodeAddr;

    fn report(addr: u64, temperature: i16) -> Report {
        Report {
            addr: NodeAddr {
                high: (addr >> 32) as u16,
                low: addr as u32,
            },
            temperature,
            voltage: 310,
        }
    }

    fn setup_channel(config: &mut Config, channel: u8, func: ChannelFunction) {
        config.channel_count = config.channel_count.max(channel + 1);
        config.channels[channel as usize].func = func.into();
    }

    #[test]
    fn first_report_enrolls_mote() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut agg = Aggregator::new();

        agg.record(&mut config, &mut state, &report(0xAAAA_1111_2222, 2345), 17);

        assert_eq!(config.node_count, 1);
        assert_eq!(config.nodes[0].channel, CHANNEL_UNASSIGNED);
        assert_eq!(&config.nodes[0].name[..9], b"[no name]");
        assert_eq!(state.nodes[0].temperature, 2345);
        assert_eq!(state.nodes[0].voltage, 310);
        assert_eq!(state.nodes[0].last_update, 17);
    }

    #[test]
    fn second_report_updates_in_place() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut agg = Aggregator::new();

        agg.record(&mut config, &mut state, &report(1, 2000), 10);
        agg.record(&mut config, &mut state, &report(1, 2100), 20);

        assert_eq!(config.node_count, 1);
        assert_eq!(state.nodes[0].temperature, 2100);
        assert_eq!(state.nodes[0].last_update, 20);
    }

    #[test]
    fn full_table_drops_unknown_motes() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut agg = Aggregator::new();

        for n in 0..NODE_CAP as u64 {
            agg.record(&mut config, &mut state, &report(n, 0), 0);
        }
        assert_eq!(config.node_count as usize, NODE_CAP);

        agg.record(&mut config, &mut state, &report(999, 1234), 0);
        assert_eq!(config.node_count as usize, NODE_CAP);
        assert_eq!(agg.dropped_reports(), 1);

        // Known motes still update.
        agg.record(&mut config, &mut state, &report(3, 1500), 0);
        assert_eq!(state.nodes[3].temperature, 1500);
        assert_eq!(agg.dropped_reports(), 1);
    }

    #[test]
    fn channel_min() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut agg = Aggregator::new();
        setup_channel(&mut config, 0, ChannelFunction::Min);

        agg.record(&mut config, &mut state, &report(1, 2500), 0);
        agg.record(&mut config, &mut state, &report(2, 2480), 0);
        config.nodes[0].channel = 0;
        config.nodes[1].channel = 0;
        agg.record(&mut config, &mut state, &report(1, 2500), 0);

        assert_eq!(state.channels[0].temperature, 2480);

        // A mote losing its measurement poisons the whole channel.
        agg.record(&mut config, &mut state, &report(1, NO_VALUE), 0);
        assert_eq!(state.channels[0].temperature, NO_VALUE);
    }

    #[test]
    fn channel_max() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut agg = Aggregator::new();
        setup_channel(&mut config, 2, ChannelFunction::Max);

        agg.record(&mut config, &mut state, &report(1, -300), 0);
        agg.record(&mut config, &mut state, &report(2, -250), 0);
        config.nodes[0].channel = 2;
        config.nodes[1].channel = 2;
        agg.record(&mut config, &mut state, &report(2, -250), 0);

        assert_eq!(state.channels[2].temperature, -250);
    }

    #[test]
    fn channel_avg_rounds_to_nearest() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut agg = Aggregator::new();
        setup_channel(&mut config, 0, ChannelFunction::Avg);

        agg.record(&mut config, &mut state, &report(1, 2500), 0);
        agg.record(&mut config, &mut state, &report(2, 2503), 0);
        config.nodes[0].channel = 0;
        config.nodes[1].channel = 0;
        agg.record(&mut config, &mut state, &report(2, 2503), 0);

        // (2500 + 2503 + 1) / 2 = 2502
        assert_eq!(state.channels[0].temperature, 2502);
    }

    #[test]
    fn singleton_channel_yields_the_sample() {
        for func in &[
            ChannelFunction::Min,
            ChannelFunction::Max,
            ChannelFunction::Avg,
        ] {
            let mut config = Config::new();
            let mut state = State::new();
            let mut agg = Aggregator::new();
            setup_channel(&mut config, 0, *func);

            agg.record(&mut config, &mut state, &report(1, 1234), 0);
            config.nodes[0].channel = 0;
            agg.record(&mut config, &mut state, &report(1, 1234), 0);
            assert_eq!(state.channels[0].temperature, 1234);
        }
    }

    #[test]
    fn empty_channel_stays_no_value() {
        let mut config = Config::new();
        let mut state = State::new();
        setup_channel(&mut config, 5, ChannelFunction::Min);
        recompute_channel(&config, &mut state, 5);
        assert_eq!(state.channels[5].temperature, NO_VALUE);
    }

    #[test]
    fn unassigned_mote_touches_no_channel() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut agg = Aggregator::new();

        agg.record(&mut config, &mut state, &report(1, 1000), 0);
        for channel in state.channels.iter() {
            assert_eq!(channel.temperature, NO_VALUE);
        }
    }
}
