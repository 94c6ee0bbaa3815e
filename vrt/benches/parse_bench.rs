// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use criterion::{criterion_group, criterion_main, Criterion};
use num_complex::Complex;
use std::hint::black_box;

use vrt::prelude::*;

fn signal_data_packet_bytes() -> Vec<u8> {
    let mut packet = Vrt::new_signal_data_packet();
    packet.set_stream_id(0xDEADBEEF);
    packet.set_timestamp_utc_seconds(1_700_000_000.5);
    let samples: Vec<Complex<f64>> = (0..360)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * 1e6 * (n as f64) / 30e6;
            Complex::new(0.5 * phase.cos(), 0.5 * phase.sin())
        })
        .collect();
    *packet.payload_mut().signal_data_mut().unwrap() =
        SignalData::from_iq_samples(&samples, DEFAULT_SCALE);
    packet.encode().unwrap()
}

fn context_packet_bytes() -> Vec<u8> {
    let mut packet = Vrt::new_context_packet();
    packet.set_stream_id(0xDEADBEEF);
    let context = packet.payload_mut().context_mut().unwrap();
    context.set_bandwidth_hz(Some(20e6));
    context.set_rf_ref_freq_hz(Some(2.4e9));
    context.set_sample_rate_hz(Some(30e6));
    context.set_gain(Some(Gain::new(15.0, 0.0)));
    packet.encode().unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let data_vec = signal_data_packet_bytes();
    let context_vec = context_packet_bytes();
    c.bench_function("Parse signal data", |p| {
        p.iter(|| Vrt::decode(black_box(&data_vec[..])).unwrap())
    });
    c.bench_function("Parse context", |p| {
        p.iter(|| Vrt::decode(black_box(&context_vec[..])).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
