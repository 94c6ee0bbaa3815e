// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Context packet payload (ANSI/VITA-49.0 section 5.1.4): a 32-bit
Context Indicator Field (CIF) followed by the fields it marks
present, laid out in strictly descending CIF-bit order.

This engine implements the subset of CIF0 this gateway needs:
bandwidth, IF/RF reference frequency, sample rate (all hertz, 44Q20
fixed point), gain, reference level, temperature, and the
state/event indicator word. Fields are always read and written in
the fixed bit order below; [`Context::decode`] rejects a packet
whose fields appear in any other order with
[`VrtError::CifOutOfOrder`].
*/

use core::fmt;

use deku::{DekuContainerRead, DekuContainerWrite};
use fixed::types::{I10F6, I44F20, I9F7};

use crate::trailer::Trailer;
use crate::{Gain, VrtError};

/// CIF bit position for the bandwidth field.
const BIT_BANDWIDTH: u8 = 29;
/// CIF bit position for the IF reference frequency field.
const BIT_IF_REF_FREQ: u8 = 28;
/// CIF bit position for the RF reference frequency field.
const BIT_RF_REF_FREQ: u8 = 27;
/// CIF bit position for the reference level field.
const BIT_REF_LEVEL: u8 = 24;
/// CIF bit position for the gain field.
const BIT_GAIN: u8 = 23;
/// CIF bit position for the sample rate field.
const BIT_SAMPLE_RATE: u8 = 21;
/// CIF bit position for the state/event indicator field.
const BIT_STATE_EVENT: u8 = 19;
/// CIF bit position for the temperature field.
const BIT_TEMPERATURE: u8 = 18;

/// Fields appear on the wire in this exact descending-bit order.
const FIELD_ORDER: [u8; 8] = [
    BIT_BANDWIDTH,
    BIT_IF_REF_FREQ,
    BIT_RF_REF_FREQ,
    BIT_REF_LEVEL,
    BIT_GAIN,
    BIT_SAMPLE_RATE,
    BIT_STATE_EVENT,
    BIT_TEMPERATURE,
];

/// Checks that CIF bits appear in strictly descending order (§4.1
/// invariant 5). `FIELD_ORDER` is itself already sorted descending, so
/// this crate's own [`Context::decode`] can never exercise the
/// rejection branch — the check exists as a standalone, independently
/// testable step for implementations (or future CIF1-3 extensions)
/// that don't derive field order solely from a fixed, pre-sorted bit
/// table.
fn check_descending_order(bits: &[u8]) -> Result<(), VrtError> {
    for pair in bits.windows(2) {
        if pair[1] >= pair[0] {
            return Err(VrtError::CifOutOfOrder {
                bit: pair[1],
                previous_bit: pair[0],
            });
        }
    }
    Ok(())
}

fn hz_to_bits(hz: f64) -> i64 {
    I44F20::saturating_from_num(hz).to_bits()
}
fn bits_to_hz(bits: i64) -> f64 {
    I44F20::from_bits(bits).to_num()
}

/// Context packet payload.
///
/// All fields are `Option`: `None` means the field's CIF bit is
/// unset and the field is absent from the wire encoding.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Context {
    bandwidth_hz: Option<i64>,
    if_ref_freq_hz: Option<i64>,
    rf_ref_freq_hz: Option<i64>,
    reference_level_dbm: Option<i16>,
    gain: Option<Gain>,
    sample_rate_hz: Option<i64>,
    state_event: Option<Trailer>,
    temperature_c: Option<i16>,
}

impl Context {
    /// Creates a new context payload with no fields set.
    pub fn new() -> Context {
        Context::default()
    }

    /// Gets the bandwidth, in hertz.
    pub fn bandwidth_hz(&self) -> Option<f64> {
        self.bandwidth_hz.map(bits_to_hz)
    }
    /// Sets the bandwidth, in hertz. `None` unsets the field.
    pub fn set_bandwidth_hz(&mut self, hz: Option<f64>) {
        self.bandwidth_hz = hz.map(hz_to_bits);
    }

    /// Gets the IF reference frequency, in hertz.
    pub fn if_ref_freq_hz(&self) -> Option<f64> {
        self.if_ref_freq_hz.map(bits_to_hz)
    }
    /// Sets the IF reference frequency, in hertz. `None` unsets the field.
    pub fn set_if_ref_freq_hz(&mut self, hz: Option<f64>) {
        self.if_ref_freq_hz = hz.map(hz_to_bits);
    }

    /// Gets the RF reference frequency, in hertz.
    pub fn rf_ref_freq_hz(&self) -> Option<f64> {
        self.rf_ref_freq_hz.map(bits_to_hz)
    }
    /// Sets the RF reference frequency, in hertz. `None` unsets the field.
    pub fn set_rf_ref_freq_hz(&mut self, hz: Option<f64>) {
        self.rf_ref_freq_hz = hz.map(hz_to_bits);
    }

    /// Gets the sample rate, in samples per second.
    pub fn sample_rate_hz(&self) -> Option<f64> {
        self.sample_rate_hz.map(bits_to_hz)
    }
    /// Sets the sample rate, in samples per second. `None` unsets the field.
    pub fn set_sample_rate_hz(&mut self, hz: Option<f64>) {
        self.sample_rate_hz = hz.map(hz_to_bits);
    }

    /// Gets the reference level, in dBm.
    pub fn reference_level_dbm(&self) -> Option<f32> {
        self.reference_level_dbm
            .map(|bits| I9F7::from_bits(bits).to_num())
    }
    /// Sets the reference level, in dBm. `None` unsets the field.
    pub fn set_reference_level_dbm(&mut self, dbm: Option<f32>) {
        self.reference_level_dbm = dbm.map(|v| I9F7::saturating_from_num(v).to_bits());
    }

    /// Gets the gain field.
    pub fn gain(&self) -> Option<Gain> {
        self.gain
    }
    /// Sets the gain field. `None` unsets the field.
    pub fn set_gain(&mut self, gain: Option<Gain>) {
        self.gain = gain;
    }

    /// Gets the temperature, in degrees Celsius. The wire
    /// representation is kelvin; this converts on the way out.
    pub fn temperature_c(&self) -> Option<f32> {
        self.temperature_c.map(|bits| {
            let kelvin: f32 = I10F6::from_bits(bits).to_num();
            kelvin - 273.15
        })
    }
    /// Sets the temperature, in degrees Celsius. `None` unsets the
    /// field. The value is converted to kelvin for the wire.
    pub fn set_temperature_c(&mut self, celsius: Option<f32>) {
        self.temperature_c =
            celsius.map(|c| I10F6::saturating_from_num(c + 273.15).to_bits());
    }

    /// Gets the state/event indicator word.
    pub fn state_event(&self) -> Option<&Trailer> {
        self.state_event.as_ref()
    }
    /// Gets a mutable reference to the state/event indicator word,
    /// creating a zeroed one if not already present.
    pub fn state_event_mut(&mut self) -> &mut Trailer {
        self.state_event.get_or_insert_with(Trailer::default)
    }
    /// Sets the state/event indicator word. `None` unsets the field.
    pub fn set_state_event(&mut self, state_event: Option<Trailer>) {
        self.state_event = state_event;
    }

    fn cif(&self) -> u32 {
        let mut cif = 0u32;
        if self.bandwidth_hz.is_some() {
            cif |= 1 << BIT_BANDWIDTH;
        }
        if self.if_ref_freq_hz.is_some() {
            cif |= 1 << BIT_IF_REF_FREQ;
        }
        if self.rf_ref_freq_hz.is_some() {
            cif |= 1 << BIT_RF_REF_FREQ;
        }
        if self.reference_level_dbm.is_some() {
            cif |= 1 << BIT_REF_LEVEL;
        }
        if self.gain.is_some() {
            cif |= 1 << BIT_GAIN;
        }
        if self.sample_rate_hz.is_some() {
            cif |= 1 << BIT_SAMPLE_RATE;
        }
        if self.state_event.is_some() {
            cif |= 1 << BIT_STATE_EVENT;
        }
        if self.temperature_c.is_some() {
            cif |= 1 << BIT_TEMPERATURE;
        }
        cif
    }

    /// Returns the size of the context payload in 32-bit words: one
    /// for the CIF plus one per present field (gain and hertz fields
    /// take two words each).
    pub fn size_words(&self) -> u16 {
        let mut words = 1u16;
        if self.bandwidth_hz.is_some() {
            words += 2;
        }
        if self.if_ref_freq_hz.is_some() {
            words += 2;
        }
        if self.rf_ref_freq_hz.is_some() {
            words += 2;
        }
        if self.reference_level_dbm.is_some() {
            words += 1;
        }
        if self.gain.is_some() {
            words += 1;
        }
        if self.sample_rate_hz.is_some() {
            words += 2;
        }
        if self.state_event.is_some() {
            words += 1;
        }
        if self.temperature_c.is_some() {
            words += 1;
        }
        words
    }

    /// Encodes the context payload as a sequence of big-endian
    /// 32-bit words, CIF first, then fields in descending CIF-bit
    /// order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size_words() as usize * 4);
        out.extend_from_slice(&self.cif().to_be_bytes());
        for bit in FIELD_ORDER {
            match bit {
                BIT_BANDWIDTH => {
                    if let Some(v) = self.bandwidth_hz {
                        out.extend_from_slice(&v.to_be_bytes());
                    }
                }
                BIT_IF_REF_FREQ => {
                    if let Some(v) = self.if_ref_freq_hz {
                        out.extend_from_slice(&v.to_be_bytes());
                    }
                }
                BIT_RF_REF_FREQ => {
                    if let Some(v) = self.rf_ref_freq_hz {
                        out.extend_from_slice(&v.to_be_bytes());
                    }
                }
                BIT_REF_LEVEL => {
                    if let Some(v) = self.reference_level_dbm {
                        // Reference level is a 16-bit field in the low
                        // half of a 32-bit word; upper bits reserved.
                        out.extend_from_slice(&(v as u16 as u32).to_be_bytes());
                    }
                }
                BIT_GAIN => {
                    if let Some(v) = self.gain {
                        out.extend_from_slice(
                            &v.to_bytes().expect("Gain always encodes to 4 bytes"),
                        );
                    }
                }
                BIT_SAMPLE_RATE => {
                    if let Some(v) = self.sample_rate_hz {
                        out.extend_from_slice(&v.to_be_bytes());
                    }
                }
                BIT_STATE_EVENT => {
                    if let Some(v) = self.state_event {
                        out.extend_from_slice(
                            &v.to_bytes().expect("Trailer always encodes to 4 bytes"),
                        );
                    }
                }
                BIT_TEMPERATURE => {
                    if let Some(v) = self.temperature_c {
                        out.extend_from_slice(&(v as u16 as u32).to_be_bytes());
                    }
                }
                _ => unreachable!("field order table only names the eight supported bits"),
            }
        }
        out
    }

    /// Decodes a context payload from big-endian bytes. Enforces
    /// that fields appear in strictly descending CIF-bit order,
    /// returning [`VrtError::CifOutOfOrder`] if not, and
    /// [`VrtError::Truncated`] if the byte slice runs out mid-field.
    pub fn decode(bytes: &[u8]) -> Result<Context, VrtError> {
        let mut words = bytes.chunks_exact(4).map(|c| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(c);
            u32::from_be_bytes(buf)
        });
        let cif = words.next().ok_or(VrtError::Truncated {
            expected: 4,
            actual: bytes.len(),
        })?;

        let present_bits: Vec<u8> = FIELD_ORDER
            .into_iter()
            .filter(|&bit| cif & (1 << bit) != 0)
            .collect();
        check_descending_order(&present_bits)?;

        let mut ctx = Context::new();
        let mut next_word = || {
            words.next().ok_or(VrtError::Truncated {
                expected: bytes.len() + 4,
                actual: bytes.len(),
            })
        };
        let mut next_i64 = |hi: u32| -> Result<i64, VrtError> {
            let lo = next_word()?;
            Ok(((hi as i64) << 32) | (lo as i64))
        };

        for bit in present_bits {
            match bit {
                BIT_BANDWIDTH => {
                    let hi = next_word()?;
                    ctx.bandwidth_hz = Some(next_i64(hi)?);
                }
                BIT_IF_REF_FREQ => {
                    let hi = next_word()?;
                    ctx.if_ref_freq_hz = Some(next_i64(hi)?);
                }
                BIT_RF_REF_FREQ => {
                    let hi = next_word()?;
                    ctx.rf_ref_freq_hz = Some(next_i64(hi)?);
                }
                BIT_REF_LEVEL => {
                    let w = next_word()?;
                    ctx.reference_level_dbm = Some(w as u16 as i16);
                }
                BIT_GAIN => {
                    let w = next_word()?;
                    ctx.gain = Some(
                        Gain::try_from(w.to_be_bytes().as_slice())
                            .expect("4 bytes always parse into a single-word Gain"),
                    );
                }
                BIT_SAMPLE_RATE => {
                    let hi = next_word()?;
                    ctx.sample_rate_hz = Some(next_i64(hi)?);
                }
                BIT_STATE_EVENT => {
                    let w = next_word()?;
                    ctx.state_event = Some(
                        Trailer::try_from(w.to_be_bytes().as_slice())
                            .expect("4 bytes always parse into a single-word Trailer"),
                    );
                }
                BIT_TEMPERATURE => {
                    let w = next_word()?;
                    ctx.temperature_c = Some(w as u16 as i16);
                }
                _ => unreachable!("field order table only names the eight supported bits"),
            }
        }
        Ok(ctx)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(bw) = self.bandwidth_hz() {
            writeln!(f, "Bandwidth: {bw} Hz")?;
        }
        if let Some(freq) = self.rf_ref_freq_hz() {
            writeln!(f, "RF reference frequency: {freq} Hz")?;
        }
        if let Some(rate) = self.sample_rate_hz() {
            writeln!(f, "Sample rate: {rate} sps")?;
        }
        if let Some(gain) = &self.gain {
            writeln!(f, "Gain: {gain}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn hertz_field_round_trips_within_one_microhertz() {
        let mut ctx = Context::new();
        ctx.set_sample_rate_hz(Some(30e6));
        let bytes = ctx.encode();
        let decoded = Context::decode(&bytes).unwrap();
        assert_relative_eq!(
            decoded.sample_rate_hz().unwrap(),
            30e6,
            epsilon = 2f64.powi(-20)
        );
    }

    #[test]
    fn fields_encode_in_descending_cif_bit_order() {
        let mut ctx = Context::new();
        ctx.set_sample_rate_hz(Some(1e6));
        ctx.set_bandwidth_hz(Some(2e5));
        ctx.set_temperature_c(Some(25.0));
        let decoded = Context::decode(&ctx.encode()).unwrap();
        assert_eq!(decoded.bandwidth_hz(), ctx.bandwidth_hz());
        assert_eq!(decoded.sample_rate_hz(), ctx.sample_rate_hz());
        assert!(decoded.temperature_c().is_some());
    }

    #[test]
    fn ascending_bit_sequence_is_rejected() {
        // Bandwidth (29) then sample rate (21) is correct descending
        // order; sample rate then bandwidth is not.
        let err = check_descending_order(&[BIT_SAMPLE_RATE, BIT_BANDWIDTH]).unwrap_err();
        assert!(matches!(err, VrtError::CifOutOfOrder { .. }));
    }

    #[test]
    fn repeated_bit_is_rejected() {
        let err = check_descending_order(&[BIT_BANDWIDTH, BIT_BANDWIDTH]).unwrap_err();
        assert!(matches!(err, VrtError::CifOutOfOrder { .. }));
    }

    #[test]
    fn descending_bit_sequence_is_accepted() {
        assert!(check_descending_order(&FIELD_ORDER).is_ok());
    }

    #[test]
    fn every_encoder_output_decodes_without_order_errors() {
        let mut ctx = Context::new();
        ctx.set_bandwidth_hz(Some(1e6));
        ctx.set_sample_rate_hz(Some(2e6));
        ctx.set_temperature_c(Some(10.0));
        assert!(Context::decode(&ctx.encode()).is_ok());
    }

    #[test]
    fn empty_context_round_trips() {
        let ctx = Context::new();
        let decoded = Context::decode(&ctx.encode()).unwrap();
        assert_eq!(decoded, ctx);
    }

    #[test]
    fn gain_round_trips_through_context() {
        let mut ctx = Context::new();
        ctx.set_gain(Some(Gain::new(15.0, 0.0)));
        let decoded = Context::decode(&ctx.encode()).unwrap();
        assert_relative_eq!(
            decoded.gain().unwrap().stage_1_gain_db(),
            15.0,
            max_relative = 0.01
        );
    }
}
