//! Performance benchmarks for the engine-side processing path
//!
//! Run with: cargo bench -p sculpt_core

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sculpt_core::{EngineConfig, EqPipeline};

fn benchmark_process_interleaved(c: &mut Criterion) {
    let mut group = c.benchmark_group("processor");

    for frames in [128_usize, 512, 2048] {
        group.throughput(Throughput::Elements(frames as u64));
        group.bench_function(format!("process_interleaved_{}_frames", frames), |b| {
            let mut pipeline = EqPipeline::new(&EngineConfig::default()).unwrap();
            pipeline.processor.prepare(48_000.0, frames);
            pipeline.params.set_peak_gain_db(6.0);

            let mut buffer: Vec<f32> = (0..frames * 2).map(|i| (i as f32 * 0.001).sin()).collect();

            b.iter(|| {
                pipeline.processor.process_interleaved(black_box(&mut buffer));
            });
        });
    }

    group.finish();
}

fn benchmark_parameter_update(c: &mut Criterion) {
    c.bench_function("params_set_peak_freq", |b| {
        let pipeline = EqPipeline::new(&EngineConfig::default()).unwrap();
        let mut freq = 200.0_f32;

        b.iter(|| {
            // Simulate dragging a slider: every set rebuilds and swaps
            // the full coefficient bank
            freq = if freq > 8_000.0 { 200.0 } else { freq + 1.0 };
            pipeline.params.set_peak_freq(black_box(freq));
        });
    });
}

criterion_group!(benches, benchmark_process_interleaved, benchmark_parameter_update);
criterion_main!(benches);
