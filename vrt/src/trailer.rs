// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Data structures and methods related to the trailer field
(ANSI/VITA-49.0 section 5.1.6): paired enable/state bits for eight
indicators, plus a 7-bit associated-context-packet counter. A state
bit is only meaningful when its enable bit is set; [`Trailer`]'s
getters return `None` when the enable bit is clear.
*/

use deku::prelude::*;

/// Base trailer field data structure.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, DekuRead, DekuWrite,
)]
#[deku(endian = "big")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trailer(u32);

macro_rules! indicator_pair {
    ($enabled:ident, $indicator:ident, $set:ident, $clear:ident, $enable_bit:expr, $state_bit:expr) => {
        /// Returns true if this indicator's enable bit is set.
        pub fn $enabled(&self) -> bool {
            self.0 & (1 << $enable_bit) != 0
        }
        /// Returns the indicator's state if its enable bit is set,
        /// `None` otherwise.
        pub fn $indicator(&self) -> Option<bool> {
            if self.$enabled() {
                Some(self.0 & (1 << $state_bit) != 0)
            } else {
                None
            }
        }
        /// Sets the indicator to the given state, also setting its
        /// enable bit. Passing `None` clears the enable bit (and the
        /// state bit, for a clean wire representation).
        pub fn $set(&mut self, state: Option<bool>) {
            match state {
                Some(v) => {
                    self.0 |= 1 << $enable_bit;
                    self.0 = (self.0 & !(1 << $state_bit)) | ((v as u32) << $state_bit);
                }
                None => {
                    self.0 &= !(1 << $enable_bit);
                    self.0 &= !(1 << $state_bit);
                }
            }
        }
        /// Clears both the enable and state bit for this indicator.
        pub fn $clear(&mut self) {
            self.0 &= !(1 << $enable_bit);
            self.0 &= !(1 << $state_bit);
        }
    };
}

impl Trailer {
    indicator_pair!(
        cal_time_enabled,
        cal_time_indicator,
        set_cal_time_indicator,
        clear_cal_time_indicator,
        31,
        19
    );
    indicator_pair!(
        valid_data_enabled,
        valid_data_indicator,
        set_valid_data_indicator,
        clear_valid_data_indicator,
        30,
        18
    );
    indicator_pair!(
        reference_lock_enabled,
        reference_lock_indicator,
        set_reference_lock_indicator,
        clear_reference_lock_indicator,
        29,
        17
    );
    indicator_pair!(
        agc_enabled,
        agc_indicator,
        set_agc_indicator,
        clear_agc_indicator,
        28,
        16
    );
    indicator_pair!(
        detected_signal_enabled,
        detected_signal_indicator,
        set_detected_signal_indicator,
        clear_detected_signal_indicator,
        27,
        15
    );
    indicator_pair!(
        spectral_inversion_enabled,
        spectral_inversion_indicator,
        set_spectral_inversion_indicator,
        clear_spectral_inversion_indicator,
        26,
        14
    );
    indicator_pair!(
        over_range_enabled,
        over_range_indicator,
        set_over_range_indicator,
        clear_over_range_indicator,
        25,
        13
    );
    indicator_pair!(
        sample_loss_enabled,
        sample_loss_indicator,
        set_sample_loss_indicator,
        clear_sample_loss_indicator,
        24,
        12
    );

    fn associated_context_packet_count_enabled(&self) -> bool {
        self.0 & (1 << 7) != 0
    }
    /// Returns the associated context packet count if present.
    pub fn associated_context_packet_count(&self) -> Option<u8> {
        if self.associated_context_packet_count_enabled() {
            Some((self.0 & 0x7F) as u8)
        } else {
            None
        }
    }
    /// Sets the associated context packet count (0..=127). Passing
    /// `None` unsets it.
    pub fn set_associated_context_packet_count(&mut self, count: Option<u8>) {
        match count {
            Some(c) => {
                self.0 |= 1 << 7;
                self.0 = (self.0 & !0x7F) | ((c & 0x7F) as u32);
            }
            None => {
                self.0 &= !(1 << 7);
                self.0 &= !0x7F;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_round_trips() {
        let mut t = Trailer::default();
        assert_eq!(t.sample_loss_indicator(), None);
        t.set_sample_loss_indicator(Some(true));
        assert_eq!(t.sample_loss_indicator(), Some(true));
        t.set_sample_loss_indicator(Some(false));
        assert_eq!(t.sample_loss_indicator(), Some(false));
        t.set_sample_loss_indicator(None);
        assert_eq!(t.sample_loss_indicator(), None);
    }

    #[test]
    fn indicators_are_independent() {
        let mut t = Trailer::default();
        t.set_over_range_indicator(Some(true));
        t.set_cal_time_indicator(Some(false));
        assert_eq!(t.over_range_indicator(), Some(true));
        assert_eq!(t.cal_time_indicator(), Some(false));
        assert_eq!(t.sample_loss_indicator(), None);
    }

    #[test]
    fn associated_context_packet_count_round_trips() {
        let mut t = Trailer::default();
        t.set_associated_context_packet_count(Some(42));
        assert_eq!(t.associated_context_packet_count(), Some(42));
        t.set_associated_context_packet_count(None);
        assert_eq!(t.associated_context_packet_count(), None);
    }
}
