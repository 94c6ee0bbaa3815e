// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(missing_docs)]
#![deny(unused_import_braces, unreachable_pub)]
#![forbid(unsafe_code)]
/*!
`gateway` is a bidirectional VITA-49 streaming gateway between a
tunable SDR sample source and a set of remote subscribers.

It publishes acquired I/Q buffers as VRT Signal Data packets on a data
port, periodically interleaves Context packets describing the current
SDR configuration, and accepts Context packets on a separate control
port to reconfigure the SDR at runtime. See [`server::StreamingServer`]
for the publishing side and [`client::ReceiverClient`] for the
subscriber side.
*/

mod client;
mod config;
mod control;
mod error;
mod registry;
mod sdr;
mod server;
mod stats;

pub use crate::client::{ReceiverClient, DEFAULT_SAMPLE_BUFFER_CAPACITY};
pub use crate::config::{ConfigPatch, GainMode, GatewayConfig, SdrConfig};
pub use crate::control::ControlListener;
pub use crate::error::{GatewayError, SdrError};
pub use crate::registry::{RegistrationOutcome, Subscriber, SubscriberRegistry};
pub use crate::sdr::{ChannelBuffer, Sdr, SdrBackend, SimulatedSdr};
pub use crate::server::StreamingServer;
pub use crate::stats::StatisticsSnapshot;

/// Standard imports for the most commonly used types in the `gateway`
/// crate, mirroring the `vrt` crate's own `prelude` convention.
pub mod prelude {
    pub use crate::client::{ReceiverClient, DEFAULT_SAMPLE_BUFFER_CAPACITY};
    pub use crate::config::{ConfigPatch, GainMode, GatewayConfig, SdrConfig};
    pub use crate::control::ControlListener;
    pub use crate::error::{GatewayError, SdrError};
    pub use crate::registry::{RegistrationOutcome, Subscriber, SubscriberRegistry};
    pub use crate::sdr::{ChannelBuffer, Sdr, SdrBackend, SimulatedSdr};
    pub use crate::server::StreamingServer;
    pub use crate::stats::StatisticsSnapshot;
}
