// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Receiver client (§4.7): the subscriber-side counterpart to
[`crate::server::StreamingServer`]. Binds the data port, demultiplexes
inbound packets by type, and exposes decoded samples and Context
snapshots to the caller either through callbacks or a bounded sample
buffer.

Grounded on `VITA49StreamClient` in `stream_server.py`
(`_receive_loop`/`get_samples`/`on_context_update`), adapted from a
Python `Queue` to a drop-oldest `VecDeque` ring buffer per the
distilled spec's redesign note (§9: unbounded queues become bounded,
drop-oldest buffers).
*/

use std::collections::VecDeque;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, warn};
use num_complex::Complex;
use vrt::{Context, PacketType, Vrt, DEFAULT_SCALE};

use crate::error::GatewayError;

type SampleCallback = dyn Fn(&[Complex<f64>]) + Send + Sync;
type ContextCallback = dyn Fn(&Context) + Send + Sync;

/// Default capacity of the drop-oldest sample ring buffer.
pub const DEFAULT_SAMPLE_BUFFER_CAPACITY: usize = 1 << 20;

/// Subscriber-side client: receives Signal Data and Context packets
/// published by a [`crate::server::StreamingServer`] (§4.7).
pub struct ReceiverClient {
    bind_port: u16,
    buffer_capacity: usize,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    packets_received: Arc<AtomicU64>,
    samples_received: Arc<AtomicU64>,
    packets_dropped: Arc<AtomicU64>,
    last_context: Arc<Mutex<Option<Context>>>,
    samples: Arc<Mutex<VecDeque<Complex<f64>>>>,
    on_samples: Option<Arc<SampleCallback>>,
    on_context: Option<Arc<ContextCallback>>,
}

impl ReceiverClient {
    /// Creates a client bound to `bind_port` once [`ReceiverClient::start`]
    /// is called, with a sample ring buffer of `buffer_capacity` complex
    /// samples.
    pub fn new(bind_port: u16, buffer_capacity: usize) -> ReceiverClient {
        ReceiverClient {
            bind_port,
            buffer_capacity,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            packets_received: Arc::new(AtomicU64::new(0)),
            samples_received: Arc::new(AtomicU64::new(0)),
            packets_dropped: Arc::new(AtomicU64::new(0)),
            last_context: Arc::new(Mutex::new(None)),
            samples: Arc::new(Mutex::new(VecDeque::new())),
            on_samples: None,
            on_context: None,
        }
    }

    /// Registers a callback invoked with every decoded Signal Data
    /// packet's samples, in addition to them being pushed into the
    /// ring buffer. The callback runs on the receive thread and must
    /// not block (§4.7).
    pub fn on_samples<F>(&mut self, callback: F)
    where
        F: Fn(&[Complex<f64>]) + Send + Sync + 'static,
    {
        self.on_samples = Some(Arc::new(callback));
    }

    /// Registers a callback invoked with every decoded Context packet.
    /// Runs on the receive thread and must not block (§4.7).
    pub fn on_context<F>(&mut self, callback: F)
    where
        F: Fn(&Context) + Send + Sync + 'static,
    {
        self.on_context = Some(Arc::new(callback));
    }

    /// Binds the data socket and spawns the receive thread.
    pub fn start(&mut self) -> Result<(), GatewayError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let socket = UdpSocket::bind(("0.0.0.0", self.bind_port)).map_err(GatewayError::Bind)?;
        socket
            .set_read_timeout(Some(Duration::from_millis(500)))
            .map_err(GatewayError::Bind)?;

        let running = Arc::clone(&self.running);
        let packets_received = Arc::clone(&self.packets_received);
        let samples_received = Arc::clone(&self.samples_received);
        let packets_dropped = Arc::clone(&self.packets_dropped);
        let last_context = Arc::clone(&self.last_context);
        let samples = Arc::clone(&self.samples);
        let buffer_capacity = self.buffer_capacity;
        let on_samples = self.on_samples.clone();
        let on_context = self.on_context.clone();

        self.thread = Some(thread::spawn(move || {
            run_receive_loop(
                socket,
                running,
                packets_received,
                samples_received,
                packets_dropped,
                last_context,
                samples,
                buffer_capacity,
                on_samples,
                on_context,
            );
        }));
        Ok(())
    }

    /// Signals the receive thread to exit and joins it. Idempotent.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }

    /// Total Signal Data + Context packets successfully decoded.
    pub fn packets_received(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    /// Total complex samples decoded from Signal Data packets.
    pub fn samples_received(&self) -> u64 {
        self.samples_received.load(Ordering::Relaxed)
    }

    /// Packets dropped: either undecodable bytes, or samples evicted
    /// from a full ring buffer before being drained.
    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped.load(Ordering::Relaxed)
    }

    /// Returns the most recently decoded Context packet, if any.
    pub fn last_context(&self) -> Option<Context> {
        self.last_context.lock().unwrap().clone()
    }

    /// Drains up to `max` samples from the ring buffer, oldest first.
    pub fn recv_samples(&self, max: usize) -> Vec<Complex<f64>> {
        let mut buf = self.samples.lock().unwrap();
        let n = max.min(buf.len());
        buf.drain(..n).collect()
    }
}

impl Drop for ReceiverClient {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
fn run_receive_loop(
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    packets_received: Arc<AtomicU64>,
    samples_received: Arc<AtomicU64>,
    packets_dropped: Arc<AtomicU64>,
    last_context: Arc<Mutex<Option<Context>>>,
    samples: Arc<Mutex<VecDeque<Complex<f64>>>>,
    buffer_capacity: usize,
    on_samples: Option<Arc<SampleCallback>>,
    on_context: Option<Arc<ContextCallback>>,
) {
    let mut buf = [0u8; 65536];
    while running.load(Ordering::Relaxed) {
        let (n, _src) = match socket.recv_from(&mut buf) {
            Ok(v) => v,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                error!("receiver client socket error: {e}");
                continue;
            }
        };

        let header = match Vrt::decode_header(&buf[..n]) {
            Ok(h) => h,
            Err(e) => {
                warn!("dropped undecodable datagram: {e}");
                packets_dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        match header.packet_type() {
            PacketType::SignalData => {
                let packet = match Vrt::decode(&buf[..n]) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("dropped malformed signal data packet: {e}");
                        packets_dropped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };
                let decoded = packet
                    .payload()
                    .signal_data()
                    .ok()
                    .and_then(|sig| sig.to_iq_samples(DEFAULT_SCALE).ok())
                    .unwrap_or_default();

                packets_received.fetch_add(1, Ordering::Relaxed);
                samples_received.fetch_add(decoded.len() as u64, Ordering::Relaxed);

                {
                    let mut ring = samples.lock().unwrap();
                    for s in &decoded {
                        if ring.len() >= buffer_capacity {
                            ring.pop_front();
                            packets_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        ring.push_back(*s);
                    }
                }

                if let Some(cb) = &on_samples {
                    cb(&decoded);
                }
            }
            PacketType::Context => {
                let packet = match Vrt::decode(&buf[..n]) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("dropped malformed context packet: {e}");
                        packets_dropped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };
                if let Ok(context) = packet.payload().context() {
                    packets_received.fetch_add(1, Ordering::Relaxed);
                    *last_context.lock().unwrap() = Some(*context);
                    if let Some(cb) = &on_context {
                        cb(context);
                    }
                }
            }
            PacketType::Unknown(v) => {
                debug!("ignoring unsupported packet type {v:#x}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    fn free_port() -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    }

    #[test]
    fn decodes_signal_data_and_fills_ring_buffer() {
        let port = free_port();
        let mut client = ReceiverClient::new(port, 1024);
        client.start().unwrap();
        thread::sleep(StdDuration::from_millis(50));

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut packet = Vrt::new_signal_data_packet();
        let samples: Vec<Complex<f64>> = (0..8).map(|_| Complex::new(0.25, -0.25)).collect();
        packet
            .payload_mut()
            .signal_data_mut()
            .unwrap()
            .set_payload(
                &vrt::SignalData::from_iq_samples(&samples, DEFAULT_SCALE).payload(),
            )
            .unwrap();
        let bytes = packet.encode().unwrap();
        sender.send_to(&bytes, ("127.0.0.1", port)).unwrap();

        thread::sleep(StdDuration::from_millis(100));
        client.stop();

        assert_eq!(client.packets_received(), 1);
        assert_eq!(client.samples_received(), 8);
        let drained = client.recv_samples(100);
        assert_eq!(drained.len(), 8);
    }

    #[test]
    fn decodes_context_and_invokes_callback() {
        let port = free_port();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let mut client = ReceiverClient::new(port, 1024);
        client.on_context(move |_ctx| {
            seen_clone.fetch_add(1, Ordering::Relaxed);
        });
        client.start().unwrap();
        thread::sleep(StdDuration::from_millis(50));

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut packet = Vrt::new_context_packet();
        packet
            .payload_mut()
            .context_mut()
            .unwrap()
            .set_sample_rate_hz(Some(10e6));
        let bytes = packet.encode().unwrap();
        sender.send_to(&bytes, ("127.0.0.1", port)).unwrap();

        thread::sleep(StdDuration::from_millis(100));
        client.stop();

        assert_eq!(seen.load(Ordering::Relaxed), 1);
        assert_eq!(client.last_context().unwrap().sample_rate_hz(), Some(10e6));
    }

    #[test]
    fn ring_buffer_drops_oldest_when_full() {
        let port = free_port();
        let mut client = ReceiverClient::new(port, 4);
        client.start().unwrap();
        thread::sleep(StdDuration::from_millis(50));

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut packet = Vrt::new_signal_data_packet();
        let samples: Vec<Complex<f64>> = (0..8).map(|i| Complex::new(i as f64 / 8.0, 0.0)).collect();
        packet
            .payload_mut()
            .signal_data_mut()
            .unwrap()
            .set_payload(
                &vrt::SignalData::from_iq_samples(&samples, DEFAULT_SCALE).payload(),
            )
            .unwrap();
        let bytes = packet.encode().unwrap();
        sender.send_to(&bytes, ("127.0.0.1", port)).unwrap();

        thread::sleep(StdDuration::from_millis(100));
        client.stop();

        let drained = client.recv_samples(100);
        assert_eq!(drained.len(), 4);
    }
}
