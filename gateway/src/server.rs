// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Streaming server (§4.5): drives the SDR acquisition loop, carves
buffers into MTU-sized VRT Signal Data packets with interpolated
per-packet timestamps, emits periodic Context packets, and fans out to
the subscriber registry.

Grounded on `VITA49StreamServer` in `stream_server.py`
(`_stream_loop`/`_send_data_packet`/`_send_context_packet`/`start`/
`stop`), adapted from Python `threading.Thread` to `std::thread`
per §5/§9 ("two OS threads... per server instance").
*/

use std::collections::HashMap;
use std::net::{IpAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};
use vrt::{make_stream_id, max_samples_per_packet, Encoder, Gain, Payload, SignalData, Trailer, Vrt};

use crate::config::{ConfigPatch, GatewayConfig};
use crate::control::ControlListener;
use crate::error::GatewayError;
use crate::registry::SubscriberRegistry;
use crate::sdr::Sdr;
use crate::stats::{ChannelStats, StatisticsSnapshot};

fn now_unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// The VRT streaming gateway server (§4.5).
///
/// Owns the SDR capability, the subscriber registry, and one packet
/// encoder per channel. `start()` spawns the streaming thread and the
/// control thread (§6); `stop()` joins both.
pub struct StreamingServer {
    config: GatewayConfig,
    sdr: Option<Sdr>,
    registry: Arc<SubscriberRegistry>,
    running: Arc<AtomicBool>,
    pending_patch: Arc<Mutex<Option<ConfigPatch>>>,
    channel_stats: HashMap<u8, Arc<ChannelStats>>,
    stream_thread: Option<JoinHandle<()>>,
    control_thread: Option<JoinHandle<()>>,
}

impl StreamingServer {
    /// Creates a new server around an already-constructed SDR
    /// capability. The SDR is connected and its channels enumerated
    /// only once `start()` is called.
    pub fn new(config: GatewayConfig, sdr: Sdr, enabled_channels: &[u8]) -> StreamingServer {
        let channel_stats = enabled_channels
            .iter()
            .map(|&ch| (ch, Arc::new(ChannelStats::new())))
            .collect();
        let registry = Arc::new(SubscriberRegistry::new(
            config.max_subscribers.max(1),
            config.fail_threshold,
            config.subscriber_timeout,
        ));
        StreamingServer {
            config,
            sdr: Some(sdr),
            registry,
            running: Arc::new(AtomicBool::new(false)),
            pending_patch: Arc::new(Mutex::new(None)),
            channel_stats,
            stream_thread: None,
            control_thread: None,
        }
    }

    /// Returns a handle to the subscriber registry, for tests and
    /// external observability.
    pub fn registry(&self) -> Arc<SubscriberRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns a statistics snapshot for one channel, if it is one of
    /// this server's enabled channels.
    pub fn statistics(&self, channel: u8) -> Option<StatisticsSnapshot> {
        self.channel_stats.get(&channel).map(|s| s.snapshot())
    }

    /// Hands a configuration patch to the server for application on
    /// the streaming thread at the top of its next loop iteration
    /// (§4.5). Overwrites any not-yet-applied pending patch.
    pub fn request_config(&self, patch: ConfigPatch) {
        *self.pending_patch.lock().unwrap() = Some(patch);
    }

    /// Connects the SDR, binds sockets, resets statistics, and spawns
    /// the streaming and control threads. Returns an error only if the
    /// SDR cannot be connected or a socket cannot be bound (§7: only
    /// `start()` reports hard failure).
    pub fn start(&mut self) -> Result<(), GatewayError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut sdr = self
            .sdr
            .take()
            .expect("StreamingServer::start called twice without a fresh SDR");
        sdr.connect()?;

        let data_socket = bind_data_socket(self.config.enable_broadcast)?;

        let now = Instant::now();
        for stats in self.channel_stats.values() {
            stats.reset(now);
        }

        let running = Arc::clone(&self.running);
        let registry = Arc::clone(&self.registry);
        let pending_patch = Arc::clone(&self.pending_patch);
        let channel_stats = self.channel_stats.clone();
        let config = self.config.clone();

        self.stream_thread = Some(thread::spawn(move || {
            run_stream_loop(
                sdr,
                data_socket,
                config,
                running,
                registry,
                pending_patch,
                channel_stats,
            );
        }));

        let control_socket = bind_control_socket(self.config.control_port, self.config.control_poll_timeout)?;
        let running = Arc::clone(&self.running);
        let registry = Arc::clone(&self.registry);
        let pending_patch = Arc::clone(&self.pending_patch);
        let data_port = self.config.data_port;

        self.control_thread = Some(thread::spawn(move || {
            run_control_loop(control_socket, running, registry, pending_patch, data_port);
        }));

        info!("streaming server started");
        Ok(())
    }

    /// Stops the server: signals both threads to exit and joins them.
    /// Idempotent — calling `stop()` on an already-stopped server is a
    /// no-op. The streaming thread finishes its current fan-out cycle
    /// before exiting; a partial fan-out is acceptable (§5).
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(t) = self.stream_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.control_thread.take() {
            let _ = t.join();
        }
        info!("streaming server stopped");
    }
}

impl Drop for StreamingServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn bind_data_socket(enable_broadcast: bool) -> Result<UdpSocket, GatewayError> {
    use socket2::{Domain, Socket, Type};
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None).map_err(GatewayError::Bind)?;
    socket
        .set_send_buffer_size(1024 * 1024)
        .map_err(GatewayError::Bind)?;
    if enable_broadcast {
        socket.set_broadcast(true).map_err(GatewayError::Bind)?;
    }
    let addr = "0.0.0.0:0".parse::<std::net::SocketAddr>().unwrap();
    socket.bind(&addr.into()).map_err(GatewayError::Bind)?;
    Ok(socket.into())
}

fn bind_control_socket(port: u16, poll_timeout: Duration) -> Result<UdpSocket, GatewayError> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).map_err(GatewayError::Bind)?;
    socket
        .set_read_timeout(Some(poll_timeout))
        .map_err(GatewayError::Bind)?;
    Ok(socket)
}

/// Per-channel encoding state owned solely by the streaming thread: a
/// packet encoder (carries the modulo-16 counter), a periodic-Context
/// counter, and latched state/event bits (§4.5, §9: "latched since
/// the last Context packet, cleared on emission").
struct ChannelState {
    stream_id: u32,
    encoder: Encoder,
    packets_since_context: u32,
    sticky: Trailer,
}

#[allow(clippy::too_many_arguments)]
fn run_stream_loop(
    mut sdr: Sdr,
    data_socket: UdpSocket,
    config: GatewayConfig,
    running: Arc<AtomicBool>,
    registry: Arc<SubscriberRegistry>,
    pending_patch: Arc<Mutex<Option<ConfigPatch>>>,
    channel_stats: HashMap<u8, Arc<ChannelStats>>,
) {
    let mut channels: HashMap<u8, ChannelState> = sdr
        .current_config()
        .enabled_channels
        .iter()
        .map(|&ch| {
            (
                ch,
                ChannelState {
                    stream_id: make_stream_id(ch, config.device_id, config.data_type),
                    encoder: Encoder::new(),
                    packets_since_context: 0,
                    sticky: Trailer::default(),
                },
            )
        })
        .collect();

    let samples_per_packet = max_samples_per_packet(config.mtu);
    let mut last_sweep = Instant::now();

    while running.load(Ordering::Relaxed) {
        if let Some(patch) = pending_patch.lock().unwrap().take() {
            let base = sdr.current_config();
            let merged = patch.apply_to(&base);
            match sdr.apply_config(&merged) {
                Ok(()) => {
                    for state in channels.values_mut() {
                        state.packets_since_context = 0;
                    }
                    let actual = sdr.current_config();
                    emit_context_to_all(
                        &actual,
                        &mut channels,
                        &data_socket,
                        &registry,
                        &channel_stats,
                    );
                }
                Err(e) => {
                    error!("rejected configuration patch, keeping previous config: {e}");
                }
            }
        }

        let buffers = match sdr.receive() {
            Some(b) => b,
            None => {
                for state in channels.values_mut() {
                    state.sticky.set_sample_loss_indicator(Some(true));
                }
                thread::sleep(Duration::from_millis(1));
                continue;
            }
        };

        let buffer_wallclock = now_unix_seconds();
        let cfg = sdr.current_config();
        let sample_rate = cfg.sample_rate_hz;

        for (&ch, samples) in cfg.enabled_channels.iter().zip(buffers.iter()) {
            let Some(state) = channels.get_mut(&ch) else {
                continue;
            };
            let Some(stats) = channel_stats.get(&ch) else {
                continue;
            };

            if state.packets_since_context >= config.context_interval {
                send_context(state, &cfg, &data_socket, &registry, stats);
                state.packets_since_context = 0;
            }

            let mut offset = 0;
            while offset < samples.len() {
                let end = (offset + samples_per_packet).min(samples.len());
                let slice = &samples[offset..end];
                let packet_ts = buffer_wallclock + offset as f64 / sample_rate;
                send_data_packet(state, slice, packet_ts, &data_socket, &registry, stats);
                offset = end;
                state.packets_since_context += 1;
            }
        }

        if last_sweep.elapsed() >= Duration::from_secs(1) {
            registry.sweep(Instant::now());
            last_sweep = Instant::now();
        }
    }

    sdr.disconnect();
}

fn send_data_packet(
    state: &mut ChannelState,
    samples: &[num_complex::Complex<f64>],
    timestamp: f64,
    socket: &UdpSocket,
    registry: &SubscriberRegistry,
    stats: &ChannelStats,
) {
    let mut packet = Vrt::new_signal_data_packet();
    packet.set_stream_id(state.stream_id);
    packet.set_timestamp_utc_seconds(timestamp);
    packet.set_payload(Payload::SignalData(SignalData::from_iq_samples(
        samples,
        vrt::DEFAULT_SCALE,
    )));

    let bytes = match state.encoder.encode(&mut packet) {
        Ok(b) => b,
        Err(e) => {
            error!("failed to encode signal data packet: {e}");
            return;
        }
    };

    fan_out(&bytes, bytes.len(), samples.len(), socket, registry, stats, false);
}

fn send_context(
    state: &mut ChannelState,
    cfg: &crate::config::SdrConfig,
    socket: &UdpSocket,
    registry: &SubscriberRegistry,
    stats: &ChannelStats,
) {
    let mut packet = Vrt::new_context_packet();
    packet.set_stream_id(state.stream_id);
    packet.set_timestamp_utc_seconds(now_unix_seconds());
    {
        let context = packet.payload_mut().context_mut().unwrap();
        context.set_bandwidth_hz(Some(cfg.bandwidth_hz));
        context.set_rf_ref_freq_hz(Some(cfg.center_freq_hz));
        context.set_sample_rate_hz(Some(cfg.sample_rate_hz));
        context.set_gain(Some(Gain::new(cfg.gain_db as f32, 0.0)));
        if state.sticky != Trailer::default() {
            context.set_state_event(Some(state.sticky));
        }
    }
    state.sticky = Trailer::default();

    let bytes = match state.encoder.encode(&mut packet) {
        Ok(b) => b,
        Err(e) => {
            error!("failed to encode context packet: {e}");
            return;
        }
    };

    fan_out(&bytes, bytes.len(), 0, socket, registry, stats, true);
}

fn emit_context_to_all(
    cfg: &crate::config::SdrConfig,
    channels: &mut HashMap<u8, ChannelState>,
    socket: &UdpSocket,
    registry: &SubscriberRegistry,
    channel_stats: &HashMap<u8, Arc<ChannelStats>>,
) {
    for (ch, state) in channels.iter_mut() {
        if let Some(stats) = channel_stats.get(ch) {
            send_context(state, cfg, socket, registry, stats);
        }
    }
}

fn fan_out(
    bytes: &[u8],
    byte_len: usize,
    sample_count: usize,
    socket: &UdpSocket,
    registry: &SubscriberRegistry,
    stats: &ChannelStats,
    is_context: bool,
) {
    for sub in registry.snapshot() {
        let dest: std::net::SocketAddr = (sub.address, sub.port).into();
        match socket.send_to(bytes, dest) {
            Ok(_) => registry.record_success(sub.address, sub.port),
            Err(e) => {
                debug!("send to {dest} failed: {e}");
                registry.record_failure(sub.address, sub.port);
                stats.record_drop();
            }
        }
    }
    if is_context {
        stats.record_context_sent();
    } else {
        stats.record_data_packet(byte_len, sample_count);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_control_loop(
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    registry: Arc<SubscriberRegistry>,
    pending_patch: Arc<Mutex<Option<ConfigPatch>>>,
    data_port: u16,
) {
    let mut buf = [0u8; 65536];
    while running.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((n, src)) => {
                let Some(patch) = ControlListener::decode_patch(&buf[..n]) else {
                    warn!("dropped malformed control packet from {src}");
                    continue;
                };
                let Some(patch) = ControlListener::validate(patch) else {
                    warn!("dropped control packet from {src} (invalid configuration)");
                    continue;
                };
                if !patch.is_empty() {
                    *pending_patch.lock().unwrap() = Some(patch);
                }
                let addr: IpAddr = src.ip();
                match registry.register_or_refresh(addr, data_port) {
                    crate::registry::RegistrationOutcome::Rejected => {
                        warn!("subscriber registry full, dropping registration from {addr}");
                    }
                    _ => debug!("registered subscriber {addr}:{data_port}"),
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                error!("control socket recv error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SdrConfig;
    use crate::sdr::Sdr;

    fn test_server() -> StreamingServer {
        let cfg = GatewayConfig {
            context_interval: 4,
            ..GatewayConfig::default()
        };
        let mut sdr_cfg = SdrConfig::default();
        sdr_cfg.acquisition_buffer_size = 16;
        sdr_cfg.sample_rate_hz = 2e6;
        let sdr = Sdr::Simulated(crate::sdr::SimulatedSdr::new(sdr_cfg));
        StreamingServer::new(cfg, sdr, &[0])
    }

    #[test]
    fn start_and_stop_is_idempotent() {
        let mut server = test_server();
        server.start().unwrap();
        server.stop();
        server.stop();
    }

    #[test]
    fn statistics_are_queryable_for_enabled_channels_only() {
        let server = test_server();
        assert!(server.statistics(0).is_some());
        assert!(server.statistics(99).is_none());
    }
}
