// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Stream identifier composition/parsing and MTU-aware packet sizing.

A stream ID is a single 32-bit word composed of a device ID, a data
type code, and a channel number: `(device_id << 24) | (data_type <<
16) | channel`. Both `channel` and `device_id` fit in a single octet
(`0..=255`); `data_type` is a 16-bit code.
*/

/// Bytes of IP + UDP header overhead assumed by [`max_samples_per_packet`].
pub const IP_UDP_OVERHEAD_BYTES: usize = 28;
/// Bytes of VRT framing overhead (header, stream ID, timestamp)
/// assumed by [`max_samples_per_packet`].
pub const VRT_OVERHEAD_BYTES: usize = 24;
/// Default samples-per-packet for a 1500-byte Ethernet MTU.
pub const DEFAULT_SAMPLES_PER_PACKET: usize = 360;

/// Composes a 32-bit stream identifier from a channel number, device
/// ID, and data type code.
///
/// # Example
/// ```
/// use vrt::make_stream_id;
/// assert_eq!(make_stream_id(3, 7, 0x1234), (7 << 24) | (0x1234 << 16) | 3);
/// ```
pub fn make_stream_id(channel: u8, device_id: u8, data_type: u16) -> u32 {
    ((device_id as u32) << 24) | ((data_type as u32) << 16) | (channel as u32)
}

/// Decomposes a 32-bit stream identifier into `(channel, device_id,
/// data_type)`.
///
/// # Example
/// ```
/// use vrt::{make_stream_id, parse_stream_id};
/// let id = make_stream_id(3, 7, 0x1234);
/// assert_eq!(parse_stream_id(id), (3, 7, 0x1234));
/// ```
pub fn parse_stream_id(stream_id: u32) -> (u8, u8, u16) {
    let channel = (stream_id & 0xFF) as u8;
    let device_id = ((stream_id >> 24) & 0xFF) as u8;
    let data_type = ((stream_id >> 16) & 0xFFFF) as u16;
    (channel, device_id, data_type)
}

/// Computes the largest even number of complex (I/Q) samples that
/// fit in a single UDP datagram for the given path MTU, after IP/UDP
/// and VRT framing overhead.
///
/// The count is forced even so a packet never splits an I/Q pair
/// across the boundary.
///
/// # Example
/// ```
/// use vrt::max_samples_per_packet;
/// assert_eq!(max_samples_per_packet(1500), 362);
/// assert_eq!(max_samples_per_packet(9000), 2236);
/// ```
pub fn max_samples_per_packet(mtu: usize) -> usize {
    let overhead = IP_UDP_OVERHEAD_BYTES + VRT_OVERHEAD_BYTES;
    let budget = mtu.saturating_sub(overhead);
    let samples = budget / 4;
    samples - (samples % 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_id_round_trips_through_construct_and_parse() {
        for (channel, device_id, data_type) in [(0u8, 0u8, 0u16), (255, 255, 0xFFFF), (3, 7, 42)] {
            let id = make_stream_id(channel, device_id, data_type);
            assert_eq!(parse_stream_id(id), (channel, device_id, data_type));
        }
    }

    #[test]
    fn max_stream_id_round_trips() {
        assert_eq!(parse_stream_id(0xFFFF_FFFF), (0xFF, 0xFF, 0xFFFF));
    }

    #[test]
    fn samples_per_packet_matches_sizing_table() {
        assert_eq!(max_samples_per_packet(576), 130);
        assert_eq!(max_samples_per_packet(1492), 360);
        assert_eq!(max_samples_per_packet(1500), 362);
        assert_eq!(max_samples_per_packet(9000), 2236);
    }

    #[test]
    fn samples_per_packet_is_always_even() {
        for mtu in [500, 576, 1000, 1492, 1500, 4000, 9000] {
            assert_eq!(max_samples_per_packet(mtu) % 2, 0);
        }
    }
}
