//! # Classifier Benchmarks
//!
//! Measures the per-sample classification path: ratio thresholds, hysteresis
//! steps and the aggregate level.
//!
//! Run: `cargo bench --bench classifier_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voc_core::{AirQualityLevel, CompensatedReading, SensorBaseline, SensorId, ThresholdRatios};
use voc_olfactory::{classify, classify_ratio, AirQualityClassifier, Hysteresis};

fn reading(sensor: u8, value: f32) -> CompensatedReading {
    CompensatedReading {
        sensor_id: SensorId(sensor),
        raw_value: value as u16,
        compensated_value: value,
        drift_factor: 1.0,
        timestamp: 0,
    }
}

fn baseline(sensor: u8) -> SensorBaseline {
    SensorBaseline {
        sensor_id: SensorId(sensor),
        baseline_value: 200.0,
        last_updated: 0,
        sample_count: 30,
    }
}

/// Benchmark stateless classification
fn bench_pure(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_pure");
    let thresholds = ThresholdRatios::default();

    group.bench_function("ratio", |b| {
        b.iter(|| black_box(classify_ratio(black_box(1.37), &thresholds)))
    });

    let base = baseline(0);
    for value in [210.0f32, 270.0, 350.0, 460.0] {
        let r = reading(0, value);
        group.bench_with_input(BenchmarkId::new("reading", value as u32), &r, |b, r| {
            b.iter(|| black_box(classify(r, &base, &thresholds)))
        });
    }

    group.finish();
}

/// Benchmark the hysteresis state machine
fn bench_hysteresis(c: &mut Criterion) {
    let mut group = c.benchmark_group("hysteresis");

    group.bench_function("raise", |b| {
        b.iter(|| black_box(Hysteresis::Stable(AirQualityLevel::Good).step(AirQualityLevel::Alert, 3)))
    });

    group.bench_function("descend_run", |b| {
        b.iter(|| {
            let mut state = Hysteresis::Stable(AirQualityLevel::Alert);
            for level in [AirQualityLevel::Good, AirQualityLevel::Moderate, AirQualityLevel::Good] {
                state = state.step(level, 3);
            }
            black_box(state)
        })
    });

    group.finish();
}

/// Benchmark the stateful classifier over both sensors
fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");
    let mut classifier = AirQualityClassifier::new(vec![ThresholdRatios::default(); 2], 3)
        .expect("valid classifier");
    let bases = [baseline(0), baseline(1)];
    let readings = [reading(0, 230.0), reading(1, 410.0)];

    group.bench_function("classify_two_sensors", |b| {
        b.iter(|| {
            for (r, base) in readings.iter().zip(bases.iter()) {
                black_box(classifier.classify(r, base).expect("known sensor"));
            }
        })
    });

    group.bench_function("aggregate", |b| b.iter(|| black_box(classifier.aggregate())));

    group.finish();
}

criterion_group!(benches, bench_pure, bench_hysteresis, bench_classifier);
criterion_main!(benches);
