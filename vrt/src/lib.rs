// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!(concat!("../", std::env!("CARGO_PKG_README")))]
#![deny(missing_docs)]
#![deny(unstable_features, unused_import_braces, unreachable_pub)]
#![allow(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::unescaped_backticks)]
#![forbid(unsafe_code)]

mod class_id;
mod context;
mod errors;
mod gain;
mod packet_header;
mod payload;
mod signal_data;
mod stream_id;
mod trailer;
mod vrt;

// Public exports
pub use crate::class_id::ClassIdentifier;
pub use crate::context::Context;
pub use crate::errors::VrtError;
pub use crate::gain::Gain;
pub use crate::packet_header::*;
pub use crate::payload::Payload;
pub use crate::signal_data::{SignalData, DEFAULT_SCALE};
pub use crate::stream_id::*;
pub use crate::trailer::Trailer;
pub use crate::vrt::{Encoder, Vrt};

/// Standard imports for the most commonly used structures and
/// traits in the `vrt` crate.
pub mod prelude {
    pub use crate::class_id::ClassIdentifier;
    pub use crate::context::Context;
    pub use crate::errors::VrtError;
    pub use crate::gain::Gain;
    pub use crate::packet_header::*;
    pub use crate::payload::Payload;
    pub use crate::signal_data::SignalData;
    pub use crate::stream_id::*;
    pub use crate::trailer::Trailer;
    pub use crate::vrt::{Encoder, Vrt};
}
