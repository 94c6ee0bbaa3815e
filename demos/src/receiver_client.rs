// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Example program that binds a [`gateway::ReceiverClient`], prints every
decoded Context packet, and reports a running sample/packet count
until interrupted.
*/

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::info;

use gateway::{ReceiverClient, DEFAULT_SAMPLE_BUFFER_CAPACITY};

#[derive(Parser, Debug)]
struct Args {
    /// Data port to bind and receive Signal Data / Context packets on.
    #[arg(long, default_value_t = 4991)]
    data_port: u16,
    /// Control port to send an initial Context packet to, registering
    /// this host as a subscriber.
    #[arg(long, default_value_t = 4990)]
    control_port: u16,
    /// Server host to register with on the control port.
    #[arg(long, default_value = "127.0.0.1")]
    server_host: String,
}

fn register_with_server(server_host: &str, control_port: u16) -> std::io::Result<()> {
    let mut packet = vrt::Vrt::new_context_packet();
    packet.set_stream_id(0);
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let bytes = packet
        .encode()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    socket.send_to(&bytes, (server_host, control_port))?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut client = ReceiverClient::new(args.data_port, DEFAULT_SAMPLE_BUFFER_CAPACITY);
    client.on_context(|ctx| {
        info!("context update: {ctx:?}");
    });
    client.start()?;

    register_with_server(&args.server_host, args.control_port)?;
    info!(
        "registered with {}:{} as a subscriber, listening on data port {}",
        args.server_host, args.control_port, args.data_port
    );

    let running = Arc::new(AtomicBool::new(true));
    let handler_running = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_running.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_secs(1));
        let samples = client.recv_samples(usize::MAX);
        info!(
            "packets_received={} samples_received={} (drained {} this tick)",
            client.packets_received(),
            client.samples_received(),
            samples.len()
        );
    }

    client.stop();
    Ok(())
}
