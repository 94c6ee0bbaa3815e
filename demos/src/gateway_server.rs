// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Example program that runs a [`gateway::StreamingServer`] against a
simulated SDR backend and serves it until interrupted.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::info;

use gateway::{GatewayConfig, Sdr, SdrConfig, SimulatedSdr, StreamingServer};

#[derive(Parser, Debug)]
struct Args {
    /// Control port to listen on for Context packets.
    #[arg(long, default_value_t = 4990)]
    control_port: u16,
    /// Data port to publish Signal Data and Context packets on.
    #[arg(long, default_value_t = 4991)]
    data_port: u16,
    /// Path MTU used to size outgoing packets.
    #[arg(long, default_value_t = 1500)]
    mtu: usize,
    /// Center frequency, in hertz.
    #[arg(long, default_value_t = 2.4e9)]
    freq_hz: f64,
    /// Sample rate, in samples per second.
    #[arg(long, default_value_t = 30e6)]
    sample_rate_hz: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let sdr_config = SdrConfig {
        center_freq_hz: args.freq_hz,
        sample_rate_hz: args.sample_rate_hz,
        bandwidth_hz: 0.8 * args.sample_rate_hz,
        ..SdrConfig::default()
    };
    let sdr = Sdr::Simulated(SimulatedSdr::new(sdr_config));

    let gateway_config = GatewayConfig {
        control_port: args.control_port,
        data_port: args.data_port,
        mtu: args.mtu,
        ..GatewayConfig::default()
    };

    let mut server = StreamingServer::new(gateway_config, sdr, &[0]);
    server.start()?;
    info!(
        "streaming server listening: control port {} data port {}",
        args.control_port, args.data_port
    );

    let running = Arc::new(AtomicBool::new(true));
    let handler_running = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_running.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    info!("shutting down");
    server.stop();
    Ok(())
}
