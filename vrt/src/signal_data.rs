// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Signal data payload (ANSI/VITA-49.0 section 5.2): interleaved I/Q
samples stored as signed 16-bit integers, I first then Q, zero-padded
to the next 32-bit word boundary.
*/

use num_complex::Complex;

use crate::VrtError;

/// Default scale factor applied by [`SignalData::from_iq_samples`]:
/// normalized samples with `|i|, |q| <= 1` are multiplied by this
/// value before being clamped to the signed-16 range.
pub const DEFAULT_SCALE: f64 = (1_u32 << 14) as f64; // 2^14

/// Signal data payload: a raw byte buffer holding interleaved,
/// big-endian signed-16 I/Q pairs.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalData {
    payload: Vec<u8>,
}

impl SignalData {
    /// Creates an empty signal data payload.
    pub fn new() -> SignalData {
        SignalData::default()
    }

    /// Builds a signal data payload from raw bytes. The byte slice is
    /// copied in as-is; use [`SignalData::from_iq_samples`] to encode
    /// normalized complex samples instead.
    pub fn from_bytes(bytes: &[u8]) -> SignalData {
        SignalData {
            payload: bytes.to_vec(),
        }
    }

    /// Encodes normalized complex samples (`|i|, |q| <= 1`) into a
    /// signal data payload, scaling by `scale` (2^14 by default, see
    /// [`DEFAULT_SCALE`]) and clamping to the signed-16 range.
    pub fn from_iq_samples(samples: &[Complex<f64>], scale: f64) -> SignalData {
        let mut payload = Vec::with_capacity(samples.len() * 4);
        for s in samples {
            let i = (s.re * scale).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            let q = (s.im * scale).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            payload.extend_from_slice(&i.to_be_bytes());
            payload.extend_from_slice(&q.to_be_bytes());
        }
        SignalData { payload }
    }

    /// Decodes the payload back into normalized complex samples,
    /// dividing by `scale` (must match the scale used to encode).
    ///
    /// # Errors
    /// Returns [`VrtError::PayloadMisaligned`] if the payload's byte
    /// length is not a multiple of 4 (one complete I/Q pair).
    pub fn to_iq_samples(&self, scale: f64) -> Result<Vec<Complex<f64>>, VrtError> {
        if self.payload.len() % 4 != 0 {
            return Err(VrtError::PayloadMisaligned(self.payload.len()));
        }
        self.payload
            .chunks_exact(4)
            .map(|chunk| {
                let i = i16::from_be_bytes([chunk[0], chunk[1]]);
                let q = i16::from_be_bytes([chunk[2], chunk[3]]);
                Complex::new(i as f64 / scale, q as f64 / scale)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(Ok)
            .collect()
    }

    /// Sets the raw payload bytes. Returns an error if the byte count
    /// is not even (the crate represents payloads as whole 16-bit
    /// samples; a lone odd trailing byte can't be a complete sample).
    pub fn set_payload(&mut self, bytes: &[u8]) -> Result<(), VrtError> {
        if bytes.len() % 2 != 0 {
            return Err(VrtError::PayloadMisaligned(bytes.len()));
        }
        self.payload = bytes.to_vec();
        Ok(())
    }

    /// Returns a copy of the raw payload bytes.
    pub fn payload(&self) -> Vec<u8> {
        self.payload.clone()
    }

    /// Returns the payload size in bytes (excludes word-boundary padding).
    pub fn payload_size_bytes(&self) -> usize {
        self.payload.len()
    }

    /// Returns the payload size in 32-bit words, rounding up to the
    /// next word boundary.
    pub fn size_words(&self) -> u16 {
        self.payload.len().div_ceil(4) as u16
    }

    /// Returns the payload bytes zero-padded to the next 32-bit word
    /// boundary, as required on the wire.
    pub fn padded_bytes(&self) -> Vec<u8> {
        let mut bytes = self.payload.clone();
        let padded_len = self.size_words() as usize * 4;
        bytes.resize(padded_len, 0);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_round_trips_with_low_mse() {
        let samples: Vec<Complex<f64>> = (0..360)
            .map(|n| {
                let phase = 2.0 * std::f64::consts::PI * 1e6 * (n as f64) / 30e6;
                Complex::new(0.5 * phase.cos(), 0.5 * phase.sin())
            })
            .collect();
        let sig = SignalData::from_iq_samples(&samples, DEFAULT_SCALE);
        let decoded = sig.to_iq_samples(DEFAULT_SCALE).unwrap();
        assert_eq!(decoded.len(), samples.len());
        let mse: f64 = samples
            .iter()
            .zip(decoded.iter())
            .map(|(a, b)| (a - b).norm_sqr())
            .sum::<f64>()
            / samples.len() as f64;
        assert!(mse < 1e-6, "mse {mse} too high");
    }

    #[test]
    fn zero_sample_payload_round_trips() {
        let sig = SignalData::from_iq_samples(&[], DEFAULT_SCALE);
        assert_eq!(sig.payload_size_bytes(), 0);
        assert_eq!(sig.to_iq_samples(DEFAULT_SCALE).unwrap().len(), 0);
    }

    #[test]
    fn padded_bytes_round_up_to_word_boundary() {
        let sig = SignalData::from_bytes(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(sig.padded_bytes().len(), 8);
    }

    #[test]
    fn odd_byte_payload_is_rejected() {
        let mut sig = SignalData::new();
        assert!(sig.set_payload(&[1, 2, 3]).is_err());
    }
}
