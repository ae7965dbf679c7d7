//! # Calibration Benchmarks
//!
//! Measures baseline accumulation, the variance check and drift lookup.
//!
//! Run: `cargo bench --bench calibration_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voc_core::{CompensatedReading, SensorId};
use voc_environment::DriftTable;
use voc_olfactory::calibration::mean_and_variance;
use voc_olfactory::{CalibrationConfig, CalibrationTracker};

/// Benchmark mean/variance over calibration windows
fn bench_variance(c: &mut Criterion) {
    let mut group = c.benchmark_group("variance");

    for size in [30usize, 120, 600] {
        let samples: Vec<f32> = (0..size).map(|i| 200.0 + (i % 7) as f32).collect();
        group.bench_with_input(BenchmarkId::new("samples", size), &samples, |b, s| {
            b.iter(|| black_box(mean_and_variance(s)))
        });
    }

    group.finish();
}

/// Benchmark a full calibration run
fn bench_calibration_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration");
    let config = CalibrationConfig::default();

    group.bench_function("run_30_samples", |b| {
        b.iter(|| {
            let mut tracker = CalibrationTracker::new(config, 1).expect("valid config");
            let sensor = SensorId(0);
            tracker.on_heater_steady(sensor).expect("known sensor");
            for i in 0..config.sample_count {
                let raw = 200 + (i % 3) as u16;
                let reading: CompensatedReading = tracker.compensate(sensor, raw, 1.0, i as u64);
                black_box(tracker.observe(&reading).expect("known sensor"));
            }
            black_box(tracker.baseline(sensor))
        })
    });

    group.finish();
}

/// Benchmark drift factor interpolation
fn bench_drift(c: &mut Criterion) {
    let mut group = c.benchmark_group("drift");
    let table = DriftTable::default();

    group.bench_function("factor", |b| {
        b.iter(|| black_box(table.factor(black_box(57.5), black_box(26.0))))
    });

    group.finish();
}

criterion_group!(benches, bench_variance, bench_calibration_run, bench_drift);
criterion_main!(benches);
