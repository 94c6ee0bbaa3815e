// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
SDR capability (§4.3): the narrow interface the streaming server
depends on to acquire I/Q buffers and push configuration.

The real hardware driver (libiio/pyadi-iio in the Python original this
spec distills) is an out-of-scope external collaborator (§1), so
[`Sdr::Hardware`] takes a caller-supplied [`SdrBackend`] implementation
rather than this crate depending on a vendor SDK directly. The
[`Sdr::Simulated`] variant is a complete, self-contained backend,
grounded on `SimulatedSDRInterface` in `stream_server.py`.
*/

use std::f64::consts::PI;
use std::thread;
use std::time::Duration;

use num_complex::Complex;
use rand::Rng;

use crate::config::SdrConfig;
use crate::error::SdrError;

/// One channel's worth of complex samples from a single `receive()` call.
pub type ChannelBuffer = Vec<Complex<f64>>;

/// Capability trait an SDR backend implements. Mirrors
/// `PlutoSDRInterface`'s method shape in the Python original:
/// `connect`/`disconnect`/`receive`/`get_current_config` become
/// `connect`/`disconnect`/`receive`/`current_config`, with
/// `apply_config` split out as the only mutator (§4.3).
pub trait SdrBackend: Send {
    /// Connects to the device and applies its initial configuration.
    fn connect(&mut self) -> Result<(), SdrError>;
    /// Applies a new configuration. Implementations may coerce
    /// requested values to the nearest permitted one; the actual
    /// accepted values are what [`SdrBackend::current_config`] must
    /// report afterward.
    fn apply_config(&mut self, cfg: &SdrConfig) -> Result<(), SdrError>;
    /// Returns the last-accepted configuration.
    fn current_config(&self) -> SdrConfig;
    /// Acquires the next buffer set: one [`ChannelBuffer`] per enabled
    /// channel, in `enabled_channels` order. `None` signals a
    /// transient acquisition failure the caller should retry shortly.
    fn receive(&mut self) -> Option<Vec<ChannelBuffer>>;
    /// Tears the connection down. Idempotent.
    fn disconnect(&mut self);
}

/// Tagged-variant SDR capability: a real device behind a
/// caller-supplied [`SdrBackend`], or the built-in [`SimulatedSdr`].
pub enum Sdr {
    /// Real hardware, driven through a caller-supplied backend.
    Hardware(Box<dyn SdrBackend>),
    /// Synthetic tone-plus-noise source for testing without hardware.
    Simulated(SimulatedSdr),
}

impl Sdr {
    /// Connects to the underlying device (§4.3).
    pub fn connect(&mut self) -> Result<(), SdrError> {
        match self {
            Sdr::Hardware(b) => b.connect(),
            Sdr::Simulated(s) => s.connect(),
        }
    }

    /// Applies a new configuration (§4.3). The previous configuration
    /// remains in effect if this returns an error.
    pub fn apply_config(&mut self, cfg: &SdrConfig) -> Result<(), SdrError> {
        match self {
            Sdr::Hardware(b) => b.apply_config(cfg),
            Sdr::Simulated(s) => s.apply_config(cfg),
        }
    }

    /// Returns the device's actual last-accepted configuration.
    pub fn current_config(&self) -> SdrConfig {
        match self {
            Sdr::Hardware(b) => b.current_config(),
            Sdr::Simulated(s) => s.current_config(),
        }
    }

    /// Acquires the next buffer set.
    pub fn receive(&mut self) -> Option<Vec<ChannelBuffer>> {
        match self {
            Sdr::Hardware(b) => b.receive(),
            Sdr::Simulated(s) => s.receive(),
        }
    }

    /// Tears the connection down. Idempotent.
    pub fn disconnect(&mut self) {
        match self {
            Sdr::Hardware(b) => b.disconnect(),
            Sdr::Simulated(s) => s.disconnect(),
        }
    }
}

/// Synthetic SDR: per-channel tone at a fixed IF offset plus additive
/// white noise, grounded on `SimulatedSDRInterface.receive` in
/// `stream_server.py`. Honors `sample_rate_hz` for timing by
/// throttling `receive()` to real time, so downstream backpressure
/// behavior (send failures, registry timeouts) is exercised the same
/// way it would be against real hardware (§4.3).
pub struct SimulatedSdr {
    config: SdrConfig,
    connected: bool,
    sample_index: u64,
    if_tone_hz: f64,
    noise_amplitude: f64,
}

impl SimulatedSdr {
    /// Default IF offset for the simulated tone, matching the
    /// Python original's `f_tone = 1e6`.
    pub const DEFAULT_IF_TONE_HZ: f64 = 1e6;
    /// Default additive-noise amplitude, matching the Python
    /// original's `0.1 * randn()`.
    pub const DEFAULT_NOISE_AMPLITUDE: f64 = 0.1;

    /// Creates a new simulated SDR with the given initial configuration.
    pub fn new(config: SdrConfig) -> SimulatedSdr {
        SimulatedSdr {
            config,
            connected: false,
            sample_index: 0,
            if_tone_hz: Self::DEFAULT_IF_TONE_HZ,
            noise_amplitude: Self::DEFAULT_NOISE_AMPLITUDE,
        }
    }

    /// Builds a simulated SDR with a non-default tone offset and
    /// noise amplitude, for tests that want a noiseless or
    /// off-frequency signal.
    pub fn with_signal(config: SdrConfig, if_tone_hz: f64, noise_amplitude: f64) -> SimulatedSdr {
        SimulatedSdr {
            config,
            connected: false,
            sample_index: 0,
            if_tone_hz,
            noise_amplitude,
        }
    }

    fn gaussian_pair(rng: &mut impl Rng) -> (f64, f64) {
        // Box-Muller transform: two independent standard-normal
        // deviates from two independent uniforms.
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        let r = (-2.0 * u1.ln()).sqrt();
        (r * (2.0 * PI * u2).cos(), r * (2.0 * PI * u2).sin())
    }
}

impl SdrBackend for SimulatedSdr {
    fn connect(&mut self) -> Result<(), SdrError> {
        self.connected = true;
        Ok(())
    }

    fn apply_config(&mut self, cfg: &SdrConfig) -> Result<(), SdrError> {
        let mut cfg = cfg.clone();
        cfg.clamp_bandwidth();
        self.config = cfg;
        Ok(())
    }

    fn current_config(&self) -> SdrConfig {
        self.config.clone()
    }

    fn receive(&mut self) -> Option<Vec<ChannelBuffer>> {
        if !self.connected {
            return None;
        }
        let n = self.config.acquisition_buffer_size;
        let fs = self.config.sample_rate_hz;
        let mut rng = rand::thread_rng();

        let mut channels = Vec::with_capacity(self.config.enabled_channels.len());
        for &ch in &self.config.enabled_channels {
            let phase_offset = ch as f64 * PI / 4.0;
            let mut buf = Vec::with_capacity(n);
            for k in 0..n {
                let t = (self.sample_index + k as u64) as f64 / fs;
                let phase = 2.0 * PI * self.if_tone_hz * t + phase_offset;
                let (n_re, n_im) = Self::gaussian_pair(&mut rng);
                let sample = Complex::new(0.7 * phase.cos(), 0.7 * phase.sin())
                    + Complex::new(n_re, n_im) * self.noise_amplitude;
                buf.push(sample);
            }
            channels.push(buf);
        }
        self.sample_index += n as u64;

        thread::sleep(Duration::from_secs_f64(n as f64 / fs));
        Some(channels)
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_sdr_yields_one_buffer_per_enabled_channel() {
        let mut cfg = SdrConfig::default();
        cfg.enabled_channels = vec![0, 1];
        cfg.acquisition_buffer_size = 16;
        cfg.sample_rate_hz = 1e6; // keep the throttling sleep short
        let mut sdr = SimulatedSdr::with_signal(cfg, 1e6, 0.0);
        sdr.connect().unwrap();
        let bufs = sdr.receive().unwrap();
        assert_eq!(bufs.len(), 2);
        assert_eq!(bufs[0].len(), 16);
    }

    #[test]
    fn disconnected_sdr_yields_nothing() {
        let mut sdr = SimulatedSdr::new(SdrConfig::default());
        assert!(sdr.receive().is_none());
    }

    #[test]
    fn apply_config_clamps_invalid_bandwidth() {
        let mut sdr = SimulatedSdr::new(SdrConfig::default());
        let bad = SdrConfig {
            bandwidth_hz: 100e6,
            sample_rate_hz: 30e6,
            ..SdrConfig::default()
        };
        sdr.apply_config(&bad).unwrap();
        assert_eq!(sdr.current_config().bandwidth_hz, 0.8 * 30e6);
    }

    #[test]
    fn noiseless_tone_has_unit_envelope() {
        let mut cfg = SdrConfig::default();
        cfg.acquisition_buffer_size = 8;
        cfg.sample_rate_hz = 1e6;
        let mut sdr = SimulatedSdr::with_signal(cfg, 1e6, 0.0);
        sdr.connect().unwrap();
        let bufs = sdr.receive().unwrap();
        for s in &bufs[0] {
            assert!((s.norm() - 0.7).abs() < 1e-9);
        }
    }
}
