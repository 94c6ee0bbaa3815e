// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Streaming statistics: a point-in-time snapshot copied out of the
server's internal counters (§3), grounded on `StreamStatistics` in
`stream_server.py`.
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A point-in-time copy of one channel's streaming counters. Carries
/// no references back into the server.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatisticsSnapshot {
    /// Signal Data packets successfully hand off to at least the socket.
    pub packets_sent: u64,
    /// Bytes sent across all Signal Data packets.
    pub bytes_sent: u64,
    /// Complex samples sent.
    pub samples_sent: u64,
    /// Packets dropped due to a send-level error.
    pub packets_dropped: u64,
    /// Context packets sent.
    pub context_packets_sent: u64,
    /// When this channel's counters were last reset (`start()`).
    pub start_time: Option<Instant>,
}

impl StatisticsSnapshot {
    /// Time elapsed since the counters were last reset.
    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Signal Data packets sent per second over `elapsed()`.
    pub fn packets_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.packets_sent as f64 / secs
        } else {
            0.0
        }
    }

    /// Throughput in megabits per second over `elapsed()`.
    pub fn mbps(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            (self.bytes_sent as f64 * 8.0 / 1e6) / secs
        } else {
            0.0
        }
    }
}

/// Internal, atomics-backed counters for one channel. Mutated only by
/// the streaming thread (§5); readers take a [`StatisticsSnapshot`].
#[derive(Debug, Default)]
pub(crate) struct ChannelStats {
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    samples_sent: AtomicU64,
    packets_dropped: AtomicU64,
    context_packets_sent: AtomicU64,
    start_time: Mutex<Option<Instant>>,
}

impl ChannelStats {
    pub(crate) fn new() -> ChannelStats {
        ChannelStats::default()
    }

    pub(crate) fn reset(&self, now: Instant) {
        self.packets_sent.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.samples_sent.store(0, Ordering::Relaxed);
        self.packets_dropped.store(0, Ordering::Relaxed);
        self.context_packets_sent.store(0, Ordering::Relaxed);
        *self.start_time.lock().unwrap() = Some(now);
    }

    pub(crate) fn record_data_packet(&self, bytes: usize, samples: usize) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.samples_sent.fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_context_sent(&self) {
        self.context_packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            samples_sent: self.samples_sent.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            context_packets_sent: self.context_packets_sent.load(Ordering::Relaxed),
            start_time: *self.start_time.lock().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let stats = ChannelStats::new();
        stats.reset(Instant::now());
        stats.record_data_packet(1500, 362);
        stats.record_data_packet(1500, 362);
        stats.record_context_sent();
        stats.record_drop();

        let snap = stats.snapshot();
        assert_eq!(snap.packets_sent, 2);
        assert_eq!(snap.bytes_sent, 3000);
        assert_eq!(snap.samples_sent, 724);
        assert_eq!(snap.context_packets_sent, 1);
        assert_eq!(snap.packets_dropped, 1);
    }

    #[test]
    fn reset_zeroes_counters_and_restarts_clock() {
        let stats = ChannelStats::new();
        stats.reset(Instant::now());
        stats.record_data_packet(100, 10);
        sleep(Duration::from_millis(5));
        stats.reset(Instant::now());
        let snap = stats.snapshot();
        assert_eq!(snap.packets_sent, 0);
        assert!(snap.elapsed() < Duration::from_millis(5));
    }
}
