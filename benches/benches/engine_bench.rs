//! # Sampling Engine Benchmarks
//!
//! Measures a full sampling tick over mock hardware with a trusted heater,
//! and event fan-out through the bus.
//!
//! Run: `cargo bench --bench engine_bench`

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voc_core::mock::{MockClimateProbe, MockTransport};
use voc_core::{
    AdcChannel, AirQualityLevel, ClimateChannel, HardwareBus, HeaterSwitch, MonitorConfig,
    MonitorEvent, SensorId,
};
use voc_heater::{HeaterConfig, HeaterController};
use voc_orchestration::{EventBus, EventFilter, EventKind, SamplingEngine};

/// Benchmark one sampling tick (environment + two gas channels)
fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling_engine");

    let config = MonitorConfig {
        heater_warmup_s: 1,
        calibration_sample_count: 3,
        env_sample_period_ms: 1,
        ..MonitorConfig::default()
    };
    let timeout = Duration::from_millis(config.channel_read_timeout_ms);
    let transport = MockTransport::new();
    transport.set_default(0, 210);
    transport.set_default(1, 330);
    let bus = HardwareBus::new(transport);

    let mut heater = HeaterController::new(
        HeaterSwitch::new(bus.clone(), timeout),
        HeaterConfig::from_monitor(&config),
    )
    .expect("valid heater config");
    heater.start(0).expect("heater start");
    heater.tick(1_000).expect("heater steady");

    let gas = config
        .sensors
        .iter()
        .map(|s| AdcChannel::new(bus.clone(), s.adc_channel, timeout).expect("valid channel"))
        .collect();
    let env = ClimateChannel::new(MockClimateProbe::with_default(55.0, 24.0), timeout);
    let events = EventBus::with_history(64);
    let mut engine = SamplingEngine::new(&config, gas, env, heater.handle(), Arc::new(events), 0)
        .expect("valid engine");

    let mut now = 1_000;
    group.bench_function("tick", |b| {
        b.iter(|| {
            now += 1_000;
            black_box(engine.tick(now).expect("tick"))
        })
    });

    group.finish();
}

/// Benchmark event fan-out to callbacks and channel subscribers
fn bench_event_bus(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_bus");
    let bus = EventBus::with_history(64);
    bus.subscribe(EventFilter::Kind(EventKind::Fault), |e| {
        black_box(e);
    })
    .expect("subscribe");
    let sub = bus
        .subscribe_channel(EventFilter::Sensor(SensorId(0)))
        .expect("subscribe channel");

    let event = MonitorEvent::SampleClassified {
        sensor_id: SensorId(0),
        level: AirQualityLevel::Moderate,
        compensated_value: 250.0,
        timestamp: 0,
    };

    group.bench_function("emit_and_drain", |b| {
        b.iter(|| {
            bus.emit(event.clone()).expect("emit");
            black_box(sub.drain())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_tick, bench_event_bus);
criterion_main!(benches);
