// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Data structures and methods related to the packet header format
(ANSI/VITA-49.0 section 5.1.1), as narrowed to the Signal Data and
Context packet types this crate supports.

The header occupies one 32-bit word:

```text
 31         28 27 26 25 24 23 22 20 19 16 15                0
+-------------+--+--+-----+-----+-----+--+------------------+
| packet type |C |T | TSI | TSF | rsvd |pkt#|     size       |
+-------------+--+--+-----+-----+-----+--+------------------+
```

`C` is the class-id-present bit, `T` is the trailer-present bit. All
reserved bits are zero.
*/

use deku::prelude::*;
use deku::{DekuContainerRead, DekuContainerWrite};

use crate::VrtError;

/// The kind of VRT packet a [`PacketHeader`] describes.
///
/// Unlike the full ANSI/VITA-49.2 type nibble, this engine only
/// understands Signal Data and Context packets; any other 4-bit
/// value decodes as [`PacketType::Unknown`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum PacketType {
    /// Signal data packet carrying interleaved I/Q samples.
    SignalData,
    /// Context packet carrying CIF-encoded metadata.
    Context,
    /// A packet type value this codec does not decode a payload for.
    Unknown(u8),
}

impl PacketType {
    const SIGNAL_DATA: u8 = 0x1;
    const CONTEXT: u8 = 0x4;

    fn as_bits(&self) -> u8 {
        match self {
            PacketType::SignalData => Self::SIGNAL_DATA,
            PacketType::Context => Self::CONTEXT,
            PacketType::Unknown(v) => *v & 0b1111,
        }
    }

    fn from_bits(bits: u8) -> PacketType {
        match bits & 0b1111 {
            Self::SIGNAL_DATA => PacketType::SignalData,
            Self::CONTEXT => PacketType::Context,
            other => PacketType::Unknown(other),
        }
    }
}

/// TimeStamp-Integer (TSI) field: selects what the integer timestamp
/// word, if present, represents.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum Tsi {
    /// No integer timestamp is present.
    #[default]
    None,
    /// Integer part is POSIX seconds since the UTC epoch (1970-01-01).
    Utc,
    /// Integer part is seconds since the GPS epoch (1980-01-06 UTC).
    Gps,
    /// Integer part is some other time base.
    Other,
}

impl Tsi {
    fn as_bits(&self) -> u8 {
        match self {
            Tsi::None => 0b00,
            Tsi::Utc => 0b01,
            Tsi::Gps => 0b10,
            Tsi::Other => 0b11,
        }
    }
    fn from_bits(bits: u8) -> Tsi {
        match bits & 0b11 {
            0b00 => Tsi::None,
            0b01 => Tsi::Utc,
            0b10 => Tsi::Gps,
            _ => Tsi::Other,
        }
    }
}

/// TimeStamp-Fractional (TSF) field: selects what the fractional
/// timestamp word, if present, represents.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum Tsf {
    /// No fractional timestamp is present.
    #[default]
    None,
    /// Fractional part is a sample count.
    SampleCount,
    /// Fractional part is picoseconds, in `[0, 10^12)`.
    Picoseconds,
    /// Fractional part is a free-running counter.
    FreeRunning,
}

impl Tsf {
    fn as_bits(&self) -> u8 {
        match self {
            Tsf::None => 0b00,
            Tsf::SampleCount => 0b01,
            Tsf::Picoseconds => 0b10,
            Tsf::FreeRunning => 0b11,
        }
    }
    fn from_bits(bits: u8) -> Tsf {
        match bits & 0b11 {
            0b00 => Tsf::None,
            0b01 => Tsf::SampleCount,
            0b10 => Tsf::Picoseconds,
            _ => Tsf::FreeRunning,
        }
    }
}

/// The one-word VRT packet header.
///
/// [`PacketHeader::decode`] is infallible: any 32-bit word decodes to
/// a well-formed header, even if its packet type is not one this
/// engine carries a payload codec for (see [`PacketType::Unknown`]).
/// Rejecting unsupported packet types is the job of the payload
/// dispatch in [`crate::Vrt::decode`], not the header decode.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, DekuRead, DekuWrite)]
#[deku(endian = "big")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketHeader {
    hword_1: u16,
    packet_size: u16,
}

impl PacketHeader {
    /// Builds a header from its constituent fields. The size field
    /// starts at zero; set it with [`PacketHeader::set_packet_size`]
    /// (normally via [`crate::Vrt::update_packet_size`]).
    pub fn new(
        packet_type: PacketType,
        class_id_present: bool,
        trailer_present: bool,
        tsi: Tsi,
        tsf: Tsf,
    ) -> PacketHeader {
        let mut hword_1 = (packet_type.as_bits() as u16) << 12;
        hword_1 |= (class_id_present as u16) << 11;
        hword_1 |= (trailer_present as u16) << 10;
        hword_1 |= (tsi.as_bits() as u16) << 6;
        hword_1 |= (tsf.as_bits() as u16) << 4;
        PacketHeader {
            hword_1,
            packet_size: 0,
        }
    }

    /// Decodes the raw 32-bit header word. Infallible: every bit
    /// pattern maps to a [`PacketHeader`], even an unsupported packet
    /// type (see [`PacketType::Unknown`]).
    pub fn decode(word: u32) -> PacketHeader {
        PacketHeader::try_from(word.to_be_bytes().as_slice())
            .expect("four bytes always deserialize into a two-u16-field header")
    }

    /// Encodes the header back to its raw 32-bit word.
    pub fn encode(&self) -> u32 {
        let bytes = self
            .to_bytes()
            .expect("a fixed two-u16-field header always encodes to four bytes");
        u32::from_be_bytes(bytes.try_into().expect("header always encodes to 4 bytes"))
    }

    /// Gets the packet type.
    pub fn packet_type(&self) -> PacketType {
        PacketType::from_bits((self.hword_1 >> 12) as u8)
    }
    /// Sets the packet type.
    pub fn set_packet_type(&mut self, packet_type: PacketType) {
        self.hword_1 = (self.hword_1 & !(0b1111 << 12)) | ((packet_type.as_bits() as u16) << 12);
    }

    /// Returns true if a class identifier is included in the packet.
    pub fn class_id_included(&self) -> bool {
        self.hword_1 & (1 << 11) != 0
    }
    /// Sets the class-id-present flag.
    pub fn set_class_id_included(&mut self, included: bool) {
        self.hword_1 = (self.hword_1 & !(1 << 11)) | ((included as u16) << 11);
    }

    /// Returns true if a trailer is included in the packet.
    pub fn trailer_included(&self) -> bool {
        self.hword_1 & (1 << 10) != 0
    }
    /// Sets the trailer-present flag.
    pub fn set_trailer_included(&mut self, included: bool) {
        self.hword_1 = (self.hword_1 & !(1 << 10)) | ((included as u16) << 10);
    }

    /// Gets the TimeStamp-Integer (TSI) field.
    pub fn tsi(&self) -> Tsi {
        Tsi::from_bits((self.hword_1 >> 6) as u8)
    }
    /// Sets the TimeStamp-Integer (TSI) field.
    pub fn set_tsi(&mut self, tsi: Tsi) {
        self.hword_1 = (self.hword_1 & !(0b11 << 6)) | ((tsi.as_bits() as u16) << 6);
    }

    /// Gets the TimeStamp-Fractional (TSF) field.
    pub fn tsf(&self) -> Tsf {
        Tsf::from_bits((self.hword_1 >> 4) as u8)
    }
    /// Sets the TimeStamp-Fractional (TSF) field.
    pub fn set_tsf(&mut self, tsf: Tsf) {
        self.hword_1 = (self.hword_1 & !(0b11 << 4)) | ((tsf.as_bits() as u16) << 4);
    }

    /// Returns true if an integer timestamp is included.
    pub fn integer_timestamp_included(&self) -> bool {
        self.tsi() != Tsi::None
    }
    /// Returns true if a fractional timestamp is included.
    pub fn fractional_timestamp_included(&self) -> bool {
        self.tsf() != Tsf::None
    }

    /// Gets the modulo-16 packet counter field.
    pub fn packet_count(&self) -> u8 {
        (self.hword_1 & 0b1111) as u8
    }
    /// Sets the modulo-16 packet counter field.
    pub fn set_packet_count(&mut self, count: u8) {
        self.hword_1 = (self.hword_1 & !0b1111) | ((count & 0b1111) as u16);
    }
    /// Increments the packet counter by one, wrapping at 16.
    pub fn inc_packet_count(&mut self) {
        self.set_packet_count((self.packet_count() + 1) % 16);
    }

    /// Gets the packet size field, in 32-bit words (includes this
    /// header word).
    pub fn packet_size(&self) -> u16 {
        self.packet_size
    }
    /// Sets the packet size field, in 32-bit words.
    pub fn set_packet_size(&mut self, n_words: u16) {
        self.packet_size = n_words;
    }

    /// Creates a new signal data packet header with no class ID,
    /// trailer, or timestamp, and a zero packet count.
    pub fn new_signal_data_header() -> PacketHeader {
        PacketHeader::new(PacketType::SignalData, false, false, Tsi::None, Tsf::None)
    }

    /// Creates a new context packet header with no class ID, trailer,
    /// or timestamp, and a zero packet count.
    pub fn new_context_header() -> PacketHeader {
        PacketHeader::new(PacketType::Context, false, false, Tsi::None, Tsf::None)
    }
}

impl TryFrom<PacketHeader> for PacketType {
    type Error = VrtError;

    fn try_from(header: PacketHeader) -> Result<Self, Self::Error> {
        match header.packet_type() {
            PacketType::Unknown(v) => Err(VrtError::UnknownPacketType(v)),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_decode_encode_decode() {
        for word in [0u32, 0xFFFF_FFFF, 0x1000_0005, 0x4C28_00FF] {
            let a = PacketHeader::decode(word);
            let b = PacketHeader::decode(a.encode());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn packet_type_round_trips() {
        let mut h = PacketHeader::new_signal_data_header();
        assert_eq!(h.packet_type(), PacketType::SignalData);
        h.set_packet_type(PacketType::Context);
        assert_eq!(h.packet_type(), PacketType::Context);
    }

    #[test]
    fn unknown_packet_type_does_not_fail_header_decode() {
        let word = 0x9000_0001u32;
        let h = PacketHeader::decode(word);
        assert!(matches!(h.packet_type(), PacketType::Unknown(0x9)));
        assert!(PacketType::try_from(h).is_err());
    }

    #[test]
    fn packet_counter_increments_modulo_16() {
        let mut h = PacketHeader::new_signal_data_header();
        h.set_packet_count(15);
        h.inc_packet_count();
        assert_eq!(h.packet_count(), 0);
    }

    #[test]
    fn reserved_bits_are_zero_on_construct() {
        let h = PacketHeader::new_signal_data_header();
        // bits 9-8 are reserved in our header layout.
        assert_eq!(h.hword_1 & 0b11_0000_0000, 0);
    }
}
