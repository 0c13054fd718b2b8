//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p sculpt_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sculpt_dsp::{
    build_filter_bank, BlockRelay, ChainSettings, ChannelChain, Slope, SpectrumGenerator,
};

const SAMPLE_RATE: f32 = 48_000.0;

fn full_chain_settings() -> ChainSettings {
    ChainSettings {
        peak_freq: 1_000.0,
        peak_gain_db: 6.0,
        peak_q: 2.0,
        low_cut_freq: 80.0,
        low_cut_slope: Slope::Db48,
        high_cut_freq: 12_000.0,
        high_cut_slope: Slope::Db48,
        ..Default::default()
    }
}

fn benchmark_chain_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_chain");

    // Common buffer sizes in audio applications
    let buffer_sizes = [64, 128, 256, 512, 1024, 2048];

    for size in buffer_sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("process_buffer_{}_samples", size), |b| {
            let mut chain = ChannelChain::new();
            chain.apply(&build_filter_bank(&full_chain_settings(), SAMPLE_RATE, 0));
            let mut buffer: Vec<f32> = (0..size).map(|i| (i as f32 * 0.001).sin()).collect();

            b.iter(|| {
                chain.process_buffer(black_box(&mut buffer));
            });
        });
    }

    group.finish();
}

fn benchmark_coefficient_rebuild(c: &mut Criterion) {
    c.bench_function("build_filter_bank", |b| {
        let mut settings = full_chain_settings();
        let mut generation = 0_u64;

        b.iter(|| {
            // Simulate dragging the peak frequency slider
            settings.peak_freq = 500.0 + (generation % 1_000) as f32;
            generation += 1;
            black_box(build_filter_bank(&settings, SAMPLE_RATE, generation));
        });
    });
}

fn benchmark_spectrum_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrum");

    for fft_size in [2_048_usize, 8_192] {
        group.throughput(Throughput::Elements(fft_size as u64));
        group.bench_function(format!("push_block_{}_fft", fft_size), |b| {
            let (mut generator, mut frames) =
                SpectrumGenerator::new(fft_size, SAMPLE_RATE, 2).unwrap();
            let block: Vec<f32> = (0..1_024).map(|i| (i as f32 * 0.01).sin()).collect();

            b.iter(|| {
                generator.push_block(black_box(&block));
                // Keep the queue drained so pushes never hit the full path
                let _ = frames.latest();
            });
        });
    }

    group.finish();
}

fn benchmark_relay_round_trip(c: &mut Criterion) {
    c.bench_function("relay_push_and_pop_block", |b| {
        let (mut tx, mut rx) = BlockRelay::with_capacity(1_024, 8).unwrap();
        let block: Vec<f32> = (0..1_024).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut out = vec![0.0_f32; 1_024];

        b.iter(|| {
            tx.push_slice(black_box(&block));
            rx.pop_block(black_box(&mut out));
        });
    });
}

criterion_group!(
    benches,
    benchmark_chain_processing,
    benchmark_coefficient_rebuild,
    benchmark_spectrum_transform,
    benchmark_relay_round_trip
);

criterion_main!(benches);
