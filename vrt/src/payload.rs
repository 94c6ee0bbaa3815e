// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Generic packet payload enumeration. The payload format differs
depending on the type of packet: Signal Data packets carry raw
interleaved I/Q samples, Context packets carry CIF-encoded fields.
*/

use crate::context::Context;
use crate::signal_data::SignalData;
use crate::VrtError;

/// Generic payload enumeration.
///
/// Normally, when using this enum, you'd unwrap the inner type using
/// one of the helper functions below.
///
/// # Example
/// ```
/// use vrt::prelude::*;
/// let mut packet = Vrt::new_context_packet();
/// let context = packet.payload_mut().context_mut().unwrap();
/// context.set_bandwidth_hz(Some(8e6));
/// ```
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// Payload for a context packet.
    Context(Context),
    /// Payload for a signal data packet.
    SignalData(SignalData),
}

impl Payload {
    /// Gets a reference to the signal data payload. "Unwraps" the
    /// generic `Payload` into a `SignalData` payload.
    ///
    /// # Errors
    /// Returns [`VrtError::SignalDataOnly`] if run on a packet other
    /// than a signal data packet.
    pub fn signal_data(&self) -> Result<&SignalData, VrtError> {
        match self {
            Payload::SignalData(p) => Ok(p),
            _ => Err(VrtError::SignalDataOnly),
        }
    }
    /// Gets a mutable reference to the signal data payload.
    ///
    /// # Errors
    /// Returns [`VrtError::SignalDataOnly`] if run on a packet other
    /// than a signal data packet.
    pub fn signal_data_mut(&mut self) -> Result<&mut SignalData, VrtError> {
        match self {
            Payload::SignalData(p) => Ok(p),
            _ => Err(VrtError::SignalDataOnly),
        }
    }

    /// Gets a reference to the context payload. "Unwraps" the generic
    /// `Payload` into a `Context` payload.
    ///
    /// # Errors
    /// Returns [`VrtError::ContextOnly`] if run on a packet other
    /// than a context packet.
    pub fn context(&self) -> Result<&Context, VrtError> {
        match self {
            Payload::Context(p) => Ok(p),
            _ => Err(VrtError::ContextOnly),
        }
    }
    /// Gets a mutable reference to the context payload.
    ///
    /// # Errors
    /// Returns [`VrtError::ContextOnly`] if run on a packet other
    /// than a context packet.
    pub fn context_mut(&mut self) -> Result<&mut Context, VrtError> {
        match self {
            Payload::Context(p) => Ok(p),
            _ => Err(VrtError::ContextOnly),
        }
    }

    /// Gets the payload size in 32-bit words.
    pub fn size_words(&self) -> u16 {
        match self {
            Payload::SignalData(p) => p.size_words(),
            Payload::Context(p) => p.size_words(),
        }
    }
}
