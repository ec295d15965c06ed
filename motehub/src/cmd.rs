//! The command dispatcher behind the chunked characteristic.
//!
//! A reassembled request is a 4-byte header (`cmd`, `tag`, 16-bit `id`) followed by a
//! command-specific body; the response repeats the shape with a status byte in place of the tag
//! and echoes the id, so a client can match answers to questions. All fields little-endian.
//!
//! `READ` and `WRITE` move raw bytes of the region selected by `tag` (0 for the configuration,
//! 1 for the state) at a client-chosen offset. The regions' `#[repr(C)]` layouts (see
//! [`data`](crate::data)) are the schema; the firmware does not interpret what a client writes
//! beyond bounds checking, which keeps the protocol stable while fields are added.
//!
//! Runs in the worker context only.

use crate::data::{Config, ConfigStore, State};
use crate::bytes::{ByteReader, ByteWriter};
use zerocopy::AsBytes;

/// Bytes of the request and response headers.
pub const HEADER_SIZE: usize = 4;

enum_with_unknown! {
    /// Supported commands.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum Opcode(u8) {
        /// Reply with the seconds since boot.
        GetUptime = 1,
        /// Copy bytes out of a region: body is `offset: u16, size: u16`.
        Read = 2,
        /// Copy bytes into a region: body is `offset: u16` followed by the data.
        Write = 3,
        /// Commit the configuration region to persistent storage.
        Keep = 4,
    }
}

enum_with_unknown! {
    /// Response status byte.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum Status(u8) {
        Ok = 0,
        UnknownCmd = 1,
        OutOfBounds = 2,
    }
}

/// Selects the memory region addressed by a request's `tag`.
fn region<'a>(tag: u8, config: &'a mut Config, state: &'a mut State) -> Option<&'a mut [u8]> {
    match tag {
        0 => Some(config.as_bytes_mut()),
        1 => Some(state.as_bytes_mut()),
        _ => None,
    }
}

/// Executes one request and builds the response.
///
/// Returns the number of response bytes, or `None` for a request too short to even carry a
/// header: there is no id to echo, so no response is produced and the client will time out and
/// retry.
pub fn execute(
    request: &[u8],
    response: &mut [u8],
    config: &mut Config,
    state: &mut State,
    store: &mut impl ConfigStore,
    uptime_secs: u32,
) -> Option<usize> {
    let mut reader = ByteReader::new(request);
    let cmd = reader.read_u8().ok()?;
    let tag = reader.read_u8().ok()?;
    let id = reader.read_u16_le().ok()?;

    let mut status = Status::Ok;
    let mut size = HEADER_SIZE;

    match Opcode::from(cmd) {
        Opcode::GetUptime => {
            let mut writer = ByteWriter::new(&mut response[HEADER_SIZE..]);
            writer.write_u32_le(uptime_secs).ok()?;
            size += 4;
        }

        Opcode::Read => match read_args(&mut reader) {
            Some((offset, count)) => {
                let max_payload = response.len() - HEADER_SIZE;
                match region(tag, config, state) {
                    Some(mem) if count <= max_payload && offset + count <= mem.len() => {
                        debug!("READ {} bytes at {} (tag {})", count, offset, tag);
                        response[HEADER_SIZE..HEADER_SIZE + count]
                            .copy_from_slice(&mem[offset..offset + count]);
                        size += count;
                    }
                    _ => status = Status::OutOfBounds,
                }
            }
            None => status = Status::OutOfBounds,
        },

        Opcode::Write => match reader.read_u16_le() {
            Ok(offset) => {
                let offset = usize::from(offset);
                let data = reader.read_rest();
                match region(tag, config, state) {
                    // The write size is implied by the request length; together with the
                    // offset it must stay inside the region.
                    Some(mem) if offset + data.len() <= mem.len() => {
                        debug!("WRITE {} bytes at {} (tag {})", data.len(), offset, tag);
                        mem[offset..offset + data.len()].copy_from_slice(data);
                    }
                    _ => status = Status::OutOfBounds,
                }
            }
            Err(_) => status = Status::OutOfBounds,
        },

        Opcode::Keep => {
            debug!("KEEP: committing configuration");
            store.keep(config);
        }

        Opcode::Unknown(cmd) => {
            warn!("unknown command {}", cmd);
            status = Status::UnknownCmd;
        }
    }

    let mut writer = ByteWriter::new(response);
    writer.write_u8(cmd).ok()?;
    writer.write_u8(status.into()).ok()?;
    writer.write_u16_le(id).ok()?;
    Some(size)
}

fn read_args(reader: &mut ByteReader<'_>) -> Option<(usize, usize)> {
    let offset = reader.read_u16_le().ok()?;
    let count = reader.read_u16_le().ok()?;
    Some((usize::from(offset), usize::from(count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::RESPONSE_MAX;
    use crate::data::NoStore;
    use core::mem;

    struct CountingStore {
        keeps: u32,
        last_version: u8,
    }

    impl ConfigStore for CountingStore {
        fn keep(&mut self, config: &Config) {
            self.keeps += 1;
            self.last_version = config.version;
        }
    }

    fn run(request: &[u8], config: &mut Config, state: &mut State) -> (Vec<u8>, usize) {
        let mut response = [0u8; RESPONSE_MAX];
        let size = execute(request, &mut response, config, state, &mut NoStore, 1234)
            .expect("no response produced");
        (response.to_vec(), size)
    }

    #[test]
    fn get_uptime() {
        let mut config = Config::new();
        let mut state = State::new();
        let (response, size) = run(&[1, 0, 0xEF, 0xBE], &mut config, &mut state);

        assert_eq!(size, 8);
        assert_eq!(&response[..4], &[1, 0, 0xEF, 0xBE]);
        assert_eq!(&response[4..8], &1234u32.to_le_bytes());
    }

    #[test]
    fn read_config_bytes() {
        let mut config = Config::new();
        config.version = 7;
        config.node_count = 2;
        let mut state = State::new();

        // READ tag=0 offset=0 size=4
        let (response, size) = run(&[2, 0, 1, 0, 0, 0, 4, 0], &mut config, &mut state);
        assert_eq!(size, 8);
        assert_eq!(response[1], 0, "status not OK");
        assert_eq!(&response[4..8], &[7, 2, 0, 0]);
    }

    #[test]
    fn read_past_region_end() {
        let mut config = Config::new();
        let mut state = State::new();

        let offset = (mem::size_of::<Config>() - 3) as u16;
        let mut request = vec![2, 0, 1, 0];
        request.extend_from_slice(&offset.to_le_bytes());
        request.extend_from_slice(&4u16.to_le_bytes());

        let (response, size) = run(&request, &mut config, &mut state);
        assert_eq!(size, HEADER_SIZE, "error response must carry no payload");
        assert_eq!(Status::from(response[1]), Status::OutOfBounds);
    }

    #[test]
    fn read_larger_than_response() {
        let mut config = Config::new();
        let mut state = State::new();

        let count = (RESPONSE_MAX - 3) as u16;
        let mut request = vec![2, 0, 1, 0, 0, 0];
        request.extend_from_slice(&count.to_le_bytes());

        let (response, _) = run(&request, &mut config, &mut state);
        assert_eq!(Status::from(response[1]), Status::OutOfBounds);
    }

    #[test]
    fn bad_tag_rejected() {
        let mut config = Config::new();
        let mut state = State::new();

        let (response, _) = run(&[2, 2, 1, 0, 0, 0, 4, 0], &mut config, &mut state);
        assert_eq!(Status::from(response[1]), Status::OutOfBounds);

        let (response, _) = run(&[3, 9, 1, 0, 0, 0, 0xAB], &mut config, &mut state);
        assert_eq!(Status::from(response[1]), Status::OutOfBounds);
    }

    #[test]
    fn write_config_bytes() {
        let mut config = Config::new();
        let mut state = State::new();

        // WRITE tag=0 offset=0: version byte and counts.
        let (response, size) = run(&[3, 0, 1, 0, 0, 0, 9, 1, 2], &mut config, &mut state);
        assert_eq!(size, HEADER_SIZE);
        assert_eq!(Status::from(response[1]), Status::Ok);
        assert_eq!(config.version, 9);
        assert_eq!(config.node_count, 1);
        assert_eq!(config.channel_count, 2);
    }

    #[test]
    fn write_bounds_checked_in_bytes() {
        let mut config = Config::new();
        let mut state = State::new();
        let region_size = mem::size_of::<Config>();

        // Three bytes starting two before the end: one byte too many.
        let offset = (region_size - 2) as u16;
        let mut request = vec![3, 0, 1, 0];
        request.extend_from_slice(&offset.to_le_bytes());
        request.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        let (response, _) = run(&request, &mut config, &mut state);
        assert_eq!(Status::from(response[1]), Status::OutOfBounds);
        assert_eq!(config.as_bytes()[region_size - 2], 0, "region was modified");

        // Two bytes at the same offset end exactly at the region boundary.
        let mut request = vec![3, 0, 1, 0];
        request.extend_from_slice(&offset.to_le_bytes());
        request.extend_from_slice(&[0xAA, 0xBB]);
        let (response, _) = run(&request, &mut config, &mut state);
        assert_eq!(Status::from(response[1]), Status::Ok);
        assert_eq!(config.as_bytes()[region_size - 1], 0xBB);
    }

    #[test]
    fn write_state_sets_time_shift() {
        let mut config = Config::new();
        let mut state = State::new();

        let mut request = vec![3, 1, 1, 0, 0, 0];
        request.extend_from_slice(&1_600_000_000u32.to_le_bytes());
        let (response, _) = run(&request, &mut config, &mut state);
        assert_eq!(Status::from(response[1]), Status::Ok);
        assert_eq!(state.time_shift(), 1_600_000_000);
    }

    #[test]
    fn keep_commits_config() {
        let mut config = Config::new();
        config.version = 3;
        let mut state = State::new();
        let mut store = CountingStore {
            keeps: 0,
            last_version: 0,
        };
        let mut response = [0u8; RESPONSE_MAX];

        let size = execute(
            &[4, 0, 7, 0],
            &mut response,
            &mut config,
            &mut state,
            &mut store,
            0,
        )
        .unwrap();
        assert_eq!(size, HEADER_SIZE);
        assert_eq!(store.keeps, 1);
        assert_eq!(store.last_version, 3);
    }

    #[test]
    fn unknown_command() {
        let mut config = Config::new();
        let mut state = State::new();
        let (response, size) = run(&[0x99, 0, 5, 0], &mut config, &mut state);
        assert_eq!(size, HEADER_SIZE);
        assert_eq!(response[0], 0x99);
        assert_eq!(Status::from(response[1]), Status::UnknownCmd);
        assert_eq!(&response[2..4], &[5, 0]);
    }

    #[test]
    fn short_requests_produce_no_response() {
        let mut config = Config::new();
        let mut state = State::new();
        let mut response = [0u8; RESPONSE_MAX];
        for request in [&[][..], &[2][..], &[2, 0][..], &[2, 0, 1][..]].iter() {
            assert_eq!(
                execute(request, &mut response, &mut config, &mut state, &mut NoStore, 0),
                None
            );
        }
    }

    #[test]
    fn truncated_read_body_is_out_of_bounds() {
        let mut config = Config::new();
        let mut state = State::new();
        let (response, size) = run(&[2, 0, 1, 0, 0, 0], &mut config, &mut state);
        assert_eq!(size, HEADER_SIZE);
        assert_eq!(Status::from(response[1]), Status::OutOfBounds);
    }
}
