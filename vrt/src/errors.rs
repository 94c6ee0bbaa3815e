// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Error types/enumerations for the `vrt` crate.
*/

use thiserror::Error;

/// Generic `vrt` crate error enumeration.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum VrtError {
    /// Indicates a payload that requires an even number of 32-bit words
    /// was given something else.
    #[error("payload must be an even number of 32-bit words")]
    PayloadUneven32BitWords,
    /// Error given when a function that can only operate on signal
    /// data packets is executed on something else.
    #[error("function can only run on signal data packets")]
    SignalDataOnly,
    /// Error given when a function that can only operate on context
    /// packets is executed on something else.
    #[error("function can only run on context packets")]
    ContextOnly,
    /// Error given when attempting to set a timestamp field with a
    /// Tsi or Tsf mode that doesn't make sense.
    #[error("attempted to set timestamp field with Tsi/Tsf mode that doesn't make sense")]
    TimestampModeMismatch,
    /// Error given when attempting to use an out-of-range value.
    #[error("out of range")]
    OutOfRange,
    /// Error given when trying to set a reserved field.
    #[error("attempted to set reserved field")]
    ReservedField,
    /// Fewer bytes were available than the header's size field promised.
    #[error("truncated packet: header promised {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes promised by the header's size field.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// The 4-bit packet type field did not match a type this codec
    /// understands how to decode a payload for.
    #[error("unknown or unsupported packet type: {0:#x}")]
    UnknownPacketType(u8),
    /// A subsequent context field was consumed for a CIF bit that was
    /// not strictly lower than the previously consumed field's bit.
    #[error(
        "context field at bit {bit} consumed after bit {previous_bit}; fields must appear in descending CIF-bit order"
    )]
    CifOutOfOrder {
        /// The offending field's CIF bit.
        bit: u8,
        /// The previously consumed field's CIF bit.
        previous_bit: u8,
    },
    /// A signal data payload's byte length was not a multiple of 2
    /// (one I/Q sample is 4 bytes, but a lone 16-bit sample is 2).
    #[error("signal data payload length {0} is not a multiple of 2")]
    PayloadMisaligned(usize),
    /// Encoding would require a packet size larger than the 16-bit
    /// word-count field in the header can represent.
    #[error("encoded packet size ({0} words) exceeds the 16-bit header size field")]
    EncodeOverflow(usize),
    /// The packet's optional-field flags disagree with which fields
    /// are actually present (a programmer error, not a wire error).
    #[error("packet flags disagree with populated fields: {0}")]
    EncodeInvalid(&'static str),
}
