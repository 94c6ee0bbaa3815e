// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Primary module for parsing/generating VRT data. This should be the
main entrypoint for any users of this crate.
*/

use deku::{DekuContainerRead, DekuContainerWrite};

use crate::class_id::ClassIdentifier;
use crate::context::Context;
use crate::errors::VrtError;
use crate::packet_header::{PacketHeader, PacketType, Tsf, Tsi};
use crate::payload::Payload;
use crate::signal_data::SignalData;
use crate::trailer::Trailer;

/// The main VRT data structure that encapsulates Signal Data and
/// Context packets.
///
/// Unlike the header's optional-stream-ID scheme in the full
/// ANSI/VITA-49.2 packet type nibble, every packet this crate
/// produces carries a stream ID: it is how the streaming server and
/// receiver client key subscribers and channels.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vrt {
    header: PacketHeader,
    stream_id: u32,
    class_id: Option<ClassIdentifier>,
    integer_timestamp: Option<u32>,
    fractional_timestamp: Option<u64>,
    payload: Payload,
    trailer: Option<Trailer>,
}

impl Vrt {
    /// Produce a new signal data packet with stream ID 0 and an empty payload.
    ///
    /// # Example
    /// ```
    /// use vrt::prelude::*;
    /// let mut packet = Vrt::new_signal_data_packet();
    /// packet.set_stream_id(0xDEADBEEF);
    /// assert_eq!(packet.stream_id(), 0xDEADBEEF);
    /// ```
    pub fn new_signal_data_packet() -> Vrt {
        Vrt {
            header: PacketHeader::new_signal_data_header(),
            stream_id: 0,
            class_id: None,
            integer_timestamp: None,
            fractional_timestamp: None,
            payload: Payload::SignalData(SignalData::new()),
            trailer: None,
        }
    }

    /// Produce a new context packet with stream ID 0 and no fields set.
    ///
    /// # Example
    /// ```
    /// use vrt::prelude::*;
    /// let mut packet = Vrt::new_context_packet();
    /// let context = packet.payload_mut().context_mut().unwrap();
    /// context.set_bandwidth_hz(Some(8e6));
    /// assert_eq!(context.bandwidth_hz(), Some(8e6));
    /// ```
    pub fn new_context_packet() -> Vrt {
        Vrt {
            header: PacketHeader::new_context_header(),
            stream_id: 0,
            class_id: None,
            integer_timestamp: None,
            fractional_timestamp: None,
            payload: Payload::Context(Context::new()),
            trailer: None,
        }
    }

    /// Gets a reference to the packet header.
    pub fn header(&self) -> &PacketHeader {
        &self.header
    }
    /// Gets a mutable reference to the packet header.
    pub fn header_mut(&mut self) -> &mut PacketHeader {
        &mut self.header
    }

    /// Gets the packet's stream ID.
    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }
    /// Sets the packet's stream ID.
    pub fn set_stream_id(&mut self, stream_id: u32) {
        self.stream_id = stream_id;
    }

    /// Gets a reference to the packet class identifier.
    pub fn class_id(&self) -> Option<&ClassIdentifier> {
        self.class_id.as_ref()
    }
    /// Gets the packet class identifier as a mutable reference.
    pub fn class_id_mut(&mut self) -> Option<&mut ClassIdentifier> {
        self.class_id.as_mut()
    }
    /// Sets the packet class identifier. `None` removes it. Updates
    /// the header's class-id-present flag to match.
    pub fn set_class_id(&mut self, class_id: Option<ClassIdentifier>) {
        self.header.set_class_id_included(class_id.is_some());
        self.class_id = class_id;
    }

    /// Gets the integer timestamp field.
    pub fn integer_timestamp(&self) -> Option<u32> {
        self.integer_timestamp
    }
    /// Sets the integer timestamp field and the header's TSI mode to
    /// match. Passing `timestamp = None` forces `tsi = Tsi::None`
    /// regardless of the `tsi` argument.
    ///
    /// # Errors
    /// Returns [`VrtError::TimestampModeMismatch`] if `timestamp` is
    /// `Some` but `tsi` is [`Tsi::None`].
    pub fn set_integer_timestamp(
        &mut self,
        timestamp: Option<u32>,
        tsi: Tsi,
    ) -> Result<(), VrtError> {
        if timestamp.is_some() && tsi == Tsi::None {
            return Err(VrtError::TimestampModeMismatch);
        }
        self.integer_timestamp = timestamp;
        self.header
            .set_tsi(if timestamp.is_some() { tsi } else { Tsi::None });
        Ok(())
    }

    /// Gets the fractional timestamp field.
    pub fn fractional_timestamp(&self) -> Option<u64> {
        self.fractional_timestamp
    }
    /// Sets the fractional timestamp field and the header's TSF mode
    /// to match. Passing `timestamp = None` forces `tsf = Tsf::None`
    /// regardless of the `tsf` argument.
    ///
    /// # Errors
    /// Returns [`VrtError::TimestampModeMismatch`] if `timestamp` is
    /// `Some` but `tsf` is [`Tsf::None`].
    pub fn set_fractional_timestamp(
        &mut self,
        timestamp: Option<u64>,
        tsf: Tsf,
    ) -> Result<(), VrtError> {
        if timestamp.is_some() && tsf == Tsf::None {
            return Err(VrtError::TimestampModeMismatch);
        }
        self.fractional_timestamp = timestamp;
        self.header
            .set_tsf(if timestamp.is_some() { tsf } else { Tsf::None });
        Ok(())
    }

    /// Sets both halves of the timestamp from a floating-point
    /// seconds-since-epoch value, picking [`Tsi::Utc`] /
    /// [`Tsf::Picoseconds`]. The fractional part is derived from the
    /// integer part rather than computed as `(t - t.floor()) * 1e12`,
    /// which loses precision for large `t`.
    pub fn set_timestamp_utc_seconds(&mut self, seconds: f64) {
        let whole = seconds.floor();
        let picos = ((seconds - whole) * 1e12).round() as u64;
        self.integer_timestamp = Some(whole as u32);
        self.fractional_timestamp = Some(picos);
        self.header.set_tsi(Tsi::Utc);
        self.header.set_tsf(Tsf::Picoseconds);
    }

    /// Reads the timestamp back out as floating-point
    /// seconds-since-epoch, the inverse of
    /// [`Vrt::set_timestamp_utc_seconds`]. Returns `None` if either
    /// half of the timestamp is absent.
    pub fn timestamp_utc_seconds(&self) -> Option<f64> {
        let whole = self.integer_timestamp? as f64;
        let picos = self.fractional_timestamp? as f64;
        Some(whole + picos / 1e12)
    }

    /// Gets a reference to the payload enumeration.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
    /// Gets a mutable reference to the payload enumeration.
    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }
    /// Replaces the payload, updating the header's packet type to match.
    pub fn set_payload(&mut self, payload: Payload) {
        self.header.set_packet_type(match payload {
            Payload::SignalData(_) => PacketType::SignalData,
            Payload::Context(_) => PacketType::Context,
        });
        self.payload = payload;
    }

    /// Gets a reference to the trailer.
    pub fn trailer(&self) -> Option<&Trailer> {
        self.trailer.as_ref()
    }
    /// Gets a mutable reference to the trailer.
    pub fn trailer_mut(&mut self) -> Option<&mut Trailer> {
        self.trailer.as_mut()
    }
    /// Sets the trailer. `None` removes it. Updates the header's
    /// trailer-present flag to match.
    pub fn set_trailer(&mut self, trailer: Option<Trailer>) {
        self.header.set_trailer_included(trailer.is_some());
        self.trailer = trailer;
    }

    /// Computes the packet size in 32-bit words: the header word,
    /// the stream ID word, the optional class ID (two words), the
    /// optional timestamp (one or two words), the payload, and the
    /// optional trailer word.
    fn size_words(&self) -> u16 {
        let mut words: u32 = 2; // header + stream ID
        if self.class_id.is_some() {
            words += 2;
        }
        if self.integer_timestamp.is_some() {
            words += 1;
        }
        if self.fractional_timestamp.is_some() {
            words += 2;
        }
        words += self.payload.size_words() as u32;
        if self.trailer.is_some() {
            words += 1;
        }
        words as u16
    }

    /// Encodes the packet to its big-endian wire representation.
    ///
    /// # Errors
    /// Returns [`VrtError::EncodeInvalid`] if the header's optional-
    /// field flags disagree with which fields are actually present
    /// (class ID, trailer, TSI/TSF vs. the timestamp `Option`s), or
    /// [`VrtError::EncodeOverflow`] if the packet's word count
    /// exceeds the header's 16-bit size field.
    pub fn encode(&self) -> Result<Vec<u8>, VrtError> {
        if self.header.class_id_included() != self.class_id.is_some() {
            return Err(VrtError::EncodeInvalid(
                "header class_id_included flag disagrees with class_id presence",
            ));
        }
        if self.header.trailer_included() != self.trailer.is_some() {
            return Err(VrtError::EncodeInvalid(
                "header trailer_included flag disagrees with trailer presence",
            ));
        }
        if self.header.integer_timestamp_included() != self.integer_timestamp.is_some() {
            return Err(VrtError::EncodeInvalid(
                "header TSI mode disagrees with integer_timestamp presence",
            ));
        }
        if self.header.fractional_timestamp_included() != self.fractional_timestamp.is_some() {
            return Err(VrtError::EncodeInvalid(
                "header TSF mode disagrees with fractional_timestamp presence",
            ));
        }

        let total_words = 2u32
            + self.class_id.map_or(0, |_| 2)
            + self.integer_timestamp.map_or(0, |_| 1)
            + self.fractional_timestamp.map_or(0, |_| 2)
            + self.payload.size_words() as u32
            + self.trailer.map_or(0, |_| 1);
        if total_words > u16::MAX as u32 {
            return Err(VrtError::EncodeOverflow(total_words as usize));
        }

        let mut header = self.header;
        header.set_packet_size(total_words as u16);

        let mut out = Vec::with_capacity(total_words as usize * 4);
        out.extend_from_slice(&header.encode().to_be_bytes());
        out.extend_from_slice(&self.stream_id.to_be_bytes());
        if let Some(class_id) = &self.class_id {
            out.extend_from_slice(
                &class_id
                    .to_bytes()
                    .expect("ClassIdentifier always encodes to 8 bytes"),
            );
        }
        if let Some(ts) = self.integer_timestamp {
            out.extend_from_slice(&ts.to_be_bytes());
        }
        if let Some(ts) = self.fractional_timestamp {
            out.extend_from_slice(&ts.to_be_bytes());
        }
        match &self.payload {
            Payload::SignalData(sig) => out.extend_from_slice(&sig.padded_bytes()),
            Payload::Context(ctx) => out.extend_from_slice(&ctx.encode()),
        }
        if let Some(trailer) = &self.trailer {
            out.extend_from_slice(
                &trailer
                    .to_bytes()
                    .expect("Trailer always encodes to 4 bytes"),
            );
        }
        Ok(out)
    }

    /// Decodes just the packet header word, without validating the
    /// rest of the packet. Useful for demultiplexing by packet type
    /// before committing to a full decode.
    pub fn decode_header(bytes: &[u8]) -> Result<PacketHeader, VrtError> {
        if bytes.len() < 4 {
            return Err(VrtError::Truncated {
                expected: 4,
                actual: bytes.len(),
            });
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[..4]);
        Ok(PacketHeader::decode(u32::from_be_bytes(word)))
    }

    /// Decodes a full packet from its big-endian wire representation.
    ///
    /// # Errors
    /// Returns [`VrtError::Truncated`] if fewer bytes are available
    /// than the header's size field promises, [`VrtError::UnknownPacketType`]
    /// if the packet type is not Signal Data or Context, and whatever
    /// error the payload codec returns (e.g. [`VrtError::CifOutOfOrder`],
    /// [`VrtError::PayloadMisaligned`]) for a malformed payload.
    pub fn decode(bytes: &[u8]) -> Result<Vrt, VrtError> {
        let header = Self::decode_header(bytes)?;
        let expected = header.packet_size() as usize * 4;
        if bytes.len() < expected {
            return Err(VrtError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }
        let body = &bytes[4..expected];

        let mut pos = 0usize;
        let take = |pos: &mut usize, n: usize| -> Result<&[u8], VrtError> {
            if body.len() < *pos + n {
                return Err(VrtError::Truncated {
                    expected: *pos + n,
                    actual: body.len(),
                });
            }
            let slice = &body[*pos..*pos + n];
            *pos += n;
            Ok(slice)
        };

        let stream_id = u32::from_be_bytes(take(&mut pos, 4)?.try_into().unwrap());

        let class_id = if header.class_id_included() {
            let raw = take(&mut pos, 8)?;
            Some(
                ClassIdentifier::try_from(raw)
                    .expect("8 bytes always parse into a two-word ClassIdentifier"),
            )
        } else {
            None
        };

        let integer_timestamp = if header.integer_timestamp_included() {
            Some(u32::from_be_bytes(take(&mut pos, 4)?.try_into().unwrap()))
        } else {
            None
        };
        let fractional_timestamp = if header.fractional_timestamp_included() {
            Some(u64::from_be_bytes(take(&mut pos, 8)?.try_into().unwrap()))
        } else {
            None
        };

        let packet_type = PacketType::try_from(header)?;
        let trailer_bytes = if header.trailer_included() { 4 } else { 0 };
        if body.len() < pos + trailer_bytes {
            return Err(VrtError::Truncated {
                expected: pos + trailer_bytes,
                actual: body.len(),
            });
        }
        let payload_bytes = &body[pos..body.len() - trailer_bytes];

        let payload = match packet_type {
            PacketType::SignalData => {
                if payload_bytes.len() % 2 != 0 {
                    return Err(VrtError::PayloadMisaligned(payload_bytes.len()));
                }
                Payload::SignalData(SignalData::from_bytes(payload_bytes))
            }
            PacketType::Context => Payload::Context(Context::decode(payload_bytes)?),
            PacketType::Unknown(v) => return Err(VrtError::UnknownPacketType(v)),
        };

        let trailer = if header.trailer_included() {
            let raw = &body[body.len() - 4..];
            Some(
                Trailer::try_from(raw)
                    .expect("4 bytes always parse into a single-word Trailer"),
            )
        } else {
            None
        };

        Ok(Vrt {
            header,
            stream_id,
            class_id,
            integer_timestamp,
            fractional_timestamp,
            payload,
            trailer,
        })
    }
}

/// Owns the per-stream, monotonically-incrementing packet counter
/// (modulo 16) and advances it after every successful encode.
///
/// The wire-level counter belongs to the producing stream, not to
/// the stateless [`Vrt::encode`]/[`Vrt::decode`] codec: a streaming
/// server holds one `Encoder` per channel.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub struct Encoder {
    counter: u8,
}

impl Encoder {
    /// Creates a new encoder with its packet counter at zero.
    pub fn new() -> Encoder {
        Encoder::default()
    }

    /// Returns the counter value that the next encoded packet will carry.
    pub fn counter(&self) -> u8 {
        self.counter
    }

    /// Stamps `packet`'s header with the current counter value,
    /// encodes it, then advances the counter modulo 16. The counter
    /// still advances even if encoding succeeds but the caller later
    /// fails to send the bytes; retransmission of a dropped packet is
    /// the caller's concern, not the encoder's.
    pub fn encode(&mut self, packet: &mut Vrt) -> Result<Vec<u8>, VrtError> {
        packet.header_mut().set_packet_count(self.counter);
        let bytes = packet.encode()?;
        self.counter = (self.counter + 1) % 16;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_data_packet_round_trips() {
        let mut packet = Vrt::new_signal_data_packet();
        packet.set_stream_id(0xDEAD_BEEF);
        packet
            .payload_mut()
            .signal_data_mut()
            .unwrap()
            .set_payload(&[1, 2, 3, 4, 5, 6, 7, 8])
            .unwrap();
        let bytes = packet.encode().unwrap();
        let decoded = Vrt::decode(&bytes).unwrap();
        assert_eq!(decoded.stream_id(), 0xDEAD_BEEF);
        assert_eq!(
            decoded.payload().signal_data().unwrap().payload(),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn context_packet_round_trips() {
        let mut packet = Vrt::new_context_packet();
        packet.set_stream_id(1);
        let context = packet.payload_mut().context_mut().unwrap();
        context.set_bandwidth_hz(Some(20e6));
        context.set_sample_rate_hz(Some(30e6));
        let bytes = packet.encode().unwrap();
        let decoded = Vrt::decode(&bytes).unwrap();
        assert_eq!(
            decoded.payload().context().unwrap().bandwidth_hz(),
            Some(20e6)
        );
    }

    #[test]
    fn timestamp_round_trips_within_one_picosecond() {
        let mut packet = Vrt::new_signal_data_packet();
        packet.set_timestamp_utc_seconds(1_700_000_000.5);
        let bytes = packet.encode().unwrap();
        let decoded = Vrt::decode(&bytes).unwrap();
        let got = decoded.timestamp_utc_seconds().unwrap();
        assert!((got - 1_700_000_000.5).abs() < 1e-12);
    }

    #[test]
    fn truncated_packet_is_rejected() {
        let packet = Vrt::new_signal_data_packet();
        let bytes = packet.encode().unwrap();
        assert!(matches!(
            Vrt::decode(&bytes[..bytes.len() - 1]),
            Err(VrtError::Truncated { .. })
        ));
    }

    #[test]
    fn unknown_packet_type_is_rejected() {
        let packet = Vrt::new_signal_data_packet();
        let mut bytes = packet.encode().unwrap();
        // Stomp the packet type nibble with an unsupported value.
        bytes[0] = (bytes[0] & 0x0F) | 0x90;
        assert!(matches!(
            Vrt::decode(&bytes),
            Err(VrtError::UnknownPacketType(0x9))
        ));
    }

    #[test]
    fn encoder_advances_packet_counter_modulo_16() {
        let mut encoder = Encoder::new();
        let mut last = 0;
        for _ in 0..20 {
            let mut packet = Vrt::new_signal_data_packet();
            let bytes = encoder.encode(&mut packet).unwrap();
            let decoded = Vrt::decode(&bytes).unwrap();
            last = decoded.header().packet_count();
        }
        assert_eq!(last, 19 % 16);
    }

    #[test]
    fn class_id_round_trips() {
        let mut packet = Vrt::new_signal_data_packet();
        packet.set_class_id(Some(ClassIdentifier::new(0xAB_CDEF, 1, 2)));
        let bytes = packet.encode().unwrap();
        let decoded = Vrt::decode(&bytes).unwrap();
        assert_eq!(decoded.class_id().unwrap().oui(), 0xAB_CDEF);
    }
}
