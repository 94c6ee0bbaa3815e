// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
SDR configuration record and the partial patch a control-port Context
packet decodes into.

Translated from the `SDRConfig` Python dataclass in
`stream_server.py` into a plain enumerated record, per the distilled
spec's own guidance (§9: "dynamic-typed config dicts → enumerated
record").
*/

use std::time::Duration;

/// Gain control mode. Mirrors `GainMode` in the Python original
/// (`manual`, `slow_attack`, `fast_attack`, `hybrid`).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum GainMode {
    /// Fixed gain, set by `gain_db`.
    #[default]
    Manual,
    /// Automatic gain control, slow attack.
    AgcSlow,
    /// Automatic gain control, fast attack.
    AgcFast,
    /// Automatic gain control, hybrid mode.
    AgcHybrid,
}

/// SDR hardware configuration record (§3).
#[derive(Clone, Debug, PartialEq)]
pub struct SdrConfig {
    /// Receive center frequency, in hertz.
    pub center_freq_hz: f64,
    /// Sample rate, in samples per second.
    pub sample_rate_hz: f64,
    /// Analog bandwidth, in hertz. Invariant: `bandwidth_hz <= sample_rate_hz`.
    pub bandwidth_hz: f64,
    /// Receive gain, in dB (meaningful only in [`GainMode::Manual`]).
    pub gain_db: f64,
    /// Gain control mode.
    pub gain_mode: GainMode,
    /// Ordered channel indices to acquire from.
    pub enabled_channels: Vec<u8>,
    /// Number of complex samples the SDR hands back per channel per
    /// `receive()` call.
    pub acquisition_buffer_size: usize,
}

impl Default for SdrConfig {
    fn default() -> SdrConfig {
        SdrConfig {
            center_freq_hz: 2.4e9,
            sample_rate_hz: 30e6,
            bandwidth_hz: 20e6,
            gain_db: 20.0,
            gain_mode: GainMode::Manual,
            enabled_channels: vec![0],
            acquisition_buffer_size: 32768,
        }
    }
}

impl SdrConfig {
    /// Enforces `bandwidth_hz <= sample_rate_hz`. If violated, clamps
    /// `bandwidth_hz` to `0.8 * sample_rate_hz` and returns `true`
    /// (the caller is expected to emit a notice when this happens,
    /// per §3).
    pub fn clamp_bandwidth(&mut self) -> bool {
        if self.bandwidth_hz <= 0.0 || self.bandwidth_hz > self.sample_rate_hz {
            self.bandwidth_hz = 0.8 * self.sample_rate_hz;
            true
        } else {
            false
        }
    }
}

/// A partial [`SdrConfig`] update, decoded from the present fields of
/// an inbound control-port Context packet (§4.6). Only fields whose
/// CIF bits were set are populated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigPatch {
    /// RF reference frequency, if present in the inbound packet.
    pub center_freq_hz: Option<f64>,
    /// Sample rate, if present.
    pub sample_rate_hz: Option<f64>,
    /// Bandwidth, if present.
    pub bandwidth_hz: Option<f64>,
    /// Stage-1 gain, if present.
    pub gain_db: Option<f64>,
}

impl ConfigPatch {
    /// Returns true if the patch carries no fields at all (nothing to apply).
    pub fn is_empty(&self) -> bool {
        self.center_freq_hz.is_none()
            && self.sample_rate_hz.is_none()
            && self.bandwidth_hz.is_none()
            && self.gain_db.is_none()
    }

    /// Merges this patch onto `base`, returning the resulting config.
    /// Re-clamps bandwidth afterward so a patch that changes the
    /// sample rate without touching bandwidth still leaves the
    /// invariant `bandwidth_hz <= sample_rate_hz` intact.
    pub fn apply_to(&self, base: &SdrConfig) -> SdrConfig {
        let mut merged = base.clone();
        if let Some(f) = self.center_freq_hz {
            merged.center_freq_hz = f;
        }
        if let Some(r) = self.sample_rate_hz {
            merged.sample_rate_hz = r;
        }
        if let Some(bw) = self.bandwidth_hz {
            merged.bandwidth_hz = bw;
        }
        if let Some(g) = self.gain_db {
            merged.gain_db = g;
        }
        merged.clamp_bandwidth();
        merged
    }
}

/// Gateway-wide parameters: ports, MTU, stream identity, and the
/// literal timing/threshold constants the distilled spec names.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Control port the server listens on (default 4990, §6).
    pub control_port: u16,
    /// Data port the server publishes on and the client listens on (default 4991, §6).
    pub data_port: u16,
    /// Path MTU used to size packets (§2/§6).
    pub mtu: usize,
    /// Device ID folded into every stream ID (§3).
    pub device_id: u8,
    /// Data-type code folded into every stream ID (§3).
    pub data_type: u16,
    /// Signal Data packets between periodic Context emissions (§4.5).
    pub context_interval: u32,
    /// Consecutive per-subscriber send failures before a slot is marked inactive (§4.4).
    pub fail_threshold: u32,
    /// How long a subscriber may go unseen before it's swept (§4.4).
    pub subscriber_timeout: Duration,
    /// Bound on the subscriber registry's size (§4.4).
    pub max_subscribers: usize,
    /// Control-socket receive timeout (§5).
    pub control_poll_timeout: Duration,
    /// Sets `SO_BROADCAST` on the data socket. The only multicast/broadcast
    /// knob this gateway exposes (§1: "no multicast group management
    /// beyond optional socket option toggling").
    pub enable_broadcast: bool,
}

impl Default for GatewayConfig {
    fn default() -> GatewayConfig {
        GatewayConfig {
            control_port: 4990,
            data_port: 4991,
            mtu: 1500,
            device_id: 1,
            data_type: 0,
            context_interval: 100,
            fail_threshold: 10,
            subscriber_timeout: Duration::from_secs(30),
            max_subscribers: 16,
            control_poll_timeout: Duration::from_millis(100),
            enable_broadcast: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bandwidth_replaces_invalid_value() {
        let mut cfg = SdrConfig {
            bandwidth_hz: 50e6,
            sample_rate_hz: 30e6,
            ..SdrConfig::default()
        };
        assert!(cfg.clamp_bandwidth());
        assert_eq!(cfg.bandwidth_hz, 0.8 * 30e6);
    }

    #[test]
    fn clamp_bandwidth_leaves_valid_value_alone() {
        let mut cfg = SdrConfig {
            bandwidth_hz: 20e6,
            sample_rate_hz: 30e6,
            ..SdrConfig::default()
        };
        assert!(!cfg.clamp_bandwidth());
        assert_eq!(cfg.bandwidth_hz, 20e6);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let base = SdrConfig::default();
        let patch = ConfigPatch {
            center_freq_hz: Some(915e6),
            ..Default::default()
        };
        let merged = patch.apply_to(&base);
        assert_eq!(merged.center_freq_hz, 915e6);
        assert_eq!(merged.sample_rate_hz, base.sample_rate_hz);
    }

    #[test]
    fn patch_reclamps_bandwidth_after_rate_change() {
        let base = SdrConfig {
            bandwidth_hz: 8e6,
            sample_rate_hz: 10e6,
            ..SdrConfig::default()
        };
        let patch = ConfigPatch {
            sample_rate_hz: Some(5e6),
            ..Default::default()
        };
        let merged = patch.apply_to(&base);
        assert_eq!(merged.bandwidth_hz, 0.8 * 5e6);
    }
}
