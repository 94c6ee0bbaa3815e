// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Structures and methods related to the class identifier
field (ANSI/VITA-49.0 section 5.1.3): a 24-bit OUI plus a
16-bit information-class code and 16-bit packet-class code.
*/
use deku::prelude::*;

/// Base class identifier data structure. Always two 32-bit words on
/// the wire: the OUI occupies the lower 24 bits of the first word,
/// the information/packet class codes make up the second word. Wire
/// (de)serialization goes through [`deku::DekuContainerWrite`] and
/// [`deku::DekuContainerRead`], not hand-rolled byte slicing.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, DekuRead, DekuWrite,
)]
#[deku(endian = "big")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassIdentifier {
    word_1: u32,
    information_class_code: u16,
    packet_class_code: u16,
}

impl ClassIdentifier {
    /// Creates a new class identifier from an OUI, information class
    /// code, and packet class code.
    pub fn new(oui: u32, information_class_code: u16, packet_class_code: u16) -> ClassIdentifier {
        let mut ret = ClassIdentifier {
            word_1: 0,
            information_class_code,
            packet_class_code,
        };
        ret.set_oui(oui);
        ret
    }

    /// Gets the Organizational Unique Identifier (OUI).
    ///
    /// # Example
    /// ```
    /// use vrt::ClassIdentifier;
    /// let class_id = ClassIdentifier::new(0x00_1234, 5, 6);
    /// assert_eq!(class_id.oui(), 0x00_1234);
    /// ```
    pub fn oui(&self) -> u32 {
        self.word_1 & 0xFF_FFFF
    }
    /// Sets the Organizational Unique Identifier (OUI).
    ///
    /// Note: while this API takes a 32-bit integer, only the least
    /// significant 24 bits are used; the upper byte is ignored.
    pub fn set_oui(&mut self, oui: u32) {
        self.word_1 = (self.word_1 & !0xFF_FFFF) | (oui & 0xFF_FFFF);
    }

    /// Gets the information class code.
    pub fn information_class_code(&self) -> u16 {
        self.information_class_code
    }
    /// Sets the information class code.
    pub fn set_information_class_code(&mut self, code: u16) {
        self.information_class_code = code;
    }

    /// Gets the packet class code.
    pub fn packet_class_code(&self) -> u16 {
        self.packet_class_code
    }
    /// Sets the packet class code.
    pub fn set_packet_class_code(&mut self, code: u16) {
        self.packet_class_code = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oui_round_trips_through_construct_and_parse() {
        let class_id = ClassIdentifier::new(0xAB_CDEF, 0x1122, 0x3344);
        assert_eq!(class_id.oui(), 0xAB_CDEF);
        assert_eq!(class_id.information_class_code(), 0x1122);
        assert_eq!(class_id.packet_class_code(), 0x3344);
    }

    #[test]
    fn oui_upper_byte_is_ignored() {
        let mut class_id = ClassIdentifier::default();
        class_id.set_oui(0xFF_AB_CDEF);
        assert_eq!(class_id.oui(), 0xAB_CDEF);
    }
}
