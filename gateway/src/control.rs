// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Control listener (§4.6): decodes inbound Context packets on the
control port into [`ConfigPatch`]es and validates them before they
reach the streaming thread.

Grounded on `VITA49StreamServer._control_loop` /
`_handle_control_message` in `stream_server.py`: decode, validate,
apply — and never reply on the control channel. The socket plumbing
that drives these pure functions lives in
[`crate::server::run_control_loop`], mirroring how the Python
original splits `_control_loop` (the socket) from the parsing it calls
into.
*/

use vrt::Vrt;

use crate::config::ConfigPatch;

/// Decodes and validates inbound control-port datagrams.
///
/// This type carries no state; it exists to group the two pure steps
/// of control-message handling so they can be tested without a socket.
pub struct ControlListener;

impl ControlListener {
    /// Decodes a received datagram as a VRT Context packet and
    /// translates its present CIF fields into a [`ConfigPatch`].
    /// Returns `None` if the bytes don't decode as a well-formed
    /// Context packet (§4.6: a malformed control packet is dropped,
    /// not propagated as an error).
    pub fn decode_patch(bytes: &[u8]) -> Option<ConfigPatch> {
        let packet = Vrt::decode(bytes).ok()?;
        let context = packet.payload().context().ok()?;
        Some(ConfigPatch {
            center_freq_hz: context.rf_ref_freq_hz(),
            sample_rate_hz: context.sample_rate_hz(),
            bandwidth_hz: context.bandwidth_hz(),
            gain_db: context.gain().map(|g| g.stage_1_gain_db() as f64),
        })
    }

    /// Rejects a patch that would leave the SDR in an unusable state:
    /// a non-positive sample rate or bandwidth. Valid-but-oversized
    /// bandwidth is left for [`crate::config::ConfigPatch::apply_to`]
    /// to clamp once merged against the base configuration, since
    /// clamping needs the (not yet known, at this layer) sample rate
    /// to compare against (§4.6).
    pub fn validate(patch: ConfigPatch) -> Option<ConfigPatch> {
        if matches!(patch.sample_rate_hz, Some(r) if r <= 0.0) {
            return None;
        }
        if matches!(patch.bandwidth_hz, Some(bw) if bw <= 0.0) {
            return None;
        }
        Some(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrt::Gain;

    fn context_packet(sample_rate: Option<f64>, bandwidth: Option<f64>) -> Vec<u8> {
        let mut packet = Vrt::new_context_packet();
        let ctx = packet.payload_mut().context_mut().unwrap();
        if let Some(r) = sample_rate {
            ctx.set_sample_rate_hz(Some(r));
        }
        if let Some(bw) = bandwidth {
            ctx.set_bandwidth_hz(Some(bw));
        }
        ctx.set_gain(Some(Gain::new(12.0, 0.0)));
        packet.encode().unwrap()
    }

    #[test]
    fn decode_patch_reads_present_fields_only() {
        let bytes = context_packet(Some(10e6), None);
        let patch = ControlListener::decode_patch(&bytes).unwrap();
        assert_eq!(patch.sample_rate_hz, Some(10e6));
        assert_eq!(patch.bandwidth_hz, None);
        assert!(patch.gain_db.is_some());
    }

    #[test]
    fn decode_patch_rejects_garbage_bytes() {
        assert!(ControlListener::decode_patch(&[0u8; 3]).is_none());
    }

    #[test]
    fn decode_patch_rejects_signal_data_packets() {
        let packet = Vrt::new_signal_data_packet();
        let bytes = packet.encode().unwrap();
        assert!(ControlListener::decode_patch(&bytes).is_none());
    }

    #[test]
    fn validate_rejects_non_positive_sample_rate() {
        let patch = ConfigPatch {
            sample_rate_hz: Some(-1.0),
            ..Default::default()
        };
        assert!(ControlListener::validate(patch).is_none());
    }

    #[test]
    fn validate_rejects_non_positive_bandwidth() {
        let patch = ConfigPatch {
            bandwidth_hz: Some(0.0),
            ..Default::default()
        };
        assert!(ControlListener::validate(patch).is_none());
    }

    #[test]
    fn validate_passes_through_oversized_bandwidth_for_later_clamping() {
        let patch = ConfigPatch {
            bandwidth_hz: Some(100e6),
            ..Default::default()
        };
        assert_eq!(
            ControlListener::validate(patch.clone()).unwrap().bandwidth_hz,
            patch.bandwidth_hz
        );
    }
}
