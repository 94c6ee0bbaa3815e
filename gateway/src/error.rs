// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Error types for the `gateway` crate, grouped the way the distilled
spec's error-handling table (§7) groups them: SDR errors, registry
errors, and everything else under one top-level enum.
*/

use thiserror::Error;

/// Errors an [`crate::sdr::SdrBackend`] can return. These are always
/// surfaced to the caller; they never terminate the streaming or
/// control threads (§7: "streaming and control tasks must never
/// terminate on a recoverable error").
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SdrError {
    /// The device could not be reached or failed to initialize.
    #[error("SDR device unavailable")]
    Unavailable,
    /// The device rejected a requested configuration field outright
    /// (as opposed to silently coercing it to a permitted value).
    #[error("SDR rejected {field}: requested {requested}, permitted {permitted}")]
    ConfigRejected {
        /// Name of the rejected field.
        field: &'static str,
        /// The value that was requested.
        requested: f64,
        /// The nearest value the device would have permitted.
        permitted: f64,
    },
}

/// Top-level `gateway` crate error enumeration.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// An SDR capability error; see [`SdrError`].
    #[error("SDR error: {0}")]
    Sdr(#[from] SdrError),
    /// The subscriber registry is at capacity ([`crate::registry::MAX_SUBSCRIBERS`]).
    #[error("subscriber registry is full")]
    RegistryFull,
    /// A socket could not be bound.
    #[error("failed to bind socket: {0}")]
    Bind(#[source] std::io::Error),
    /// A VRT codec error bubbled up from the `vrt` crate.
    #[error("vrt codec error: {0}")]
    Vrt(#[from] vrt::VrtError),
    /// A generic I/O error (send/recv) not otherwise categorized.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
