//! # Laço de amostragem
//!
//! Cada tick, em ordem fixa:
//!
//! 1. Sensor ambiental, se `env_sample_period_ms` já passou
//! 2. Verificação de dados ambientais velhos e fator de drift
//! 3. Sensores de gás na ordem da configuração
//! 4. Nível agregado
//!
//! Toda leitura tem uma nova tentativa imediata. Duas falhas seguidas no mesmo
//! canal emitem `SensorFault` uma vez por episódio e deixam o sensor em
//! UNKNOWN; os demais canais seguem normalmente no mesmo tick.
//!
//! Leituras só são compensadas e classificadas quando o aquecedor está em
//! STEADY há pelo menos o aquecimento documentado do sensor.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};
use voc_core::{
    AggregateLevel, AirQualityLevel, ChannelError, ChannelId, ClimateReading, EnvironmentSample,
    EventSink, HardwareChannel, MonitorConfig, MonitorEvent, RawSample, SensorBaseline, SensorId,
    Timestamp,
};
use voc_environment::EnvironmentMonitor;
use voc_heater::HeaterHandle;
use voc_olfactory::{
    AirQualityClassifier, BaselineSnapshot, CalibrationOutcome, CalibrationTracker, LevelChange,
};

use crate::error::{OrchestrationError, OrchestrationResult};

/// Resumo de um tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub environment_read: bool,
    /// Sensores com leitura confiável neste tick
    pub trusted: Vec<SensorId>,
    /// Canais com falha (duas tentativas) neste tick
    pub faulted: Vec<ChannelId>,
}

/// Um sensor de gás na rodada
#[derive(Debug)]
struct GasSlot<G> {
    id: SensorId,
    name: String,
    channel: G,
    warmup_ms: u64,
    /// Leitura anterior foi confiável
    trusted: bool,
    /// Episódio de falha em curso (evento já emitido)
    faulted: bool,
}

#[derive(Debug)]
struct EnvSlot<E> {
    channel: E,
    period_ms: u64,
    next_read_at: Timestamp,
    faulted: bool,
}

/// Orquestra as leituras multiplexadas, a calibração e a classificação
pub struct SamplingEngine<G, E>
where
    G: HardwareChannel<Reading = u16>,
    E: HardwareChannel<Reading = ClimateReading>,
{
    gas: Vec<GasSlot<G>>,
    env: EnvSlot<E>,
    environment: EnvironmentMonitor,
    calibration: CalibrationTracker,
    classifier: AirQualityClassifier,
    heater: HeaterHandle,
    sink: Arc<dyn EventSink>,
    aggregate: AggregateLevel,
    tick_count: u64,
}

impl<G, E> SamplingEngine<G, E>
where
    G: HardwareChannel<Reading = u16>,
    E: HardwareChannel<Reading = ClimateReading>,
{
    /// `gas` deve seguir a ordem de `config.sensors`
    pub fn new(
        config: &MonitorConfig,
        gas: Vec<G>,
        env: E,
        heater: HeaterHandle,
        sink: Arc<dyn EventSink>,
        started_at: Timestamp,
    ) -> OrchestrationResult<Self> {
        config.validate()?;
        if gas.len() != config.sensors.len() {
            return Err(OrchestrationError::InvalidConfiguration(format!(
                "{} gas channels for {} configured sensors",
                gas.len(),
                config.sensors.len()
            )));
        }

        let gas: Vec<GasSlot<G>> = config
            .sensor_ids()
            .zip(gas)
            .map(|((id, sensor), channel)| GasSlot {
                id,
                name: sensor.name.clone(),
                channel,
                warmup_ms: config.sensor_warmup_ms(id),
                trusted: false,
                faulted: false,
            })
            .collect();

        let classifier = AirQualityClassifier::from_config(config)?;
        let aggregate = classifier.aggregate();
        Ok(Self {
            env: EnvSlot {
                channel: env,
                period_ms: config.env_sample_period_ms,
                next_read_at: started_at,
                faulted: false,
            },
            environment: EnvironmentMonitor::from_config(config, started_at)?,
            calibration: CalibrationTracker::from_config(config)?,
            classifier,
            heater,
            sink,
            aggregate,
            tick_count: 0,
            gas,
        })
    }

    /// Executa um tick completo
    pub fn tick(&mut self, now: Timestamp) -> OrchestrationResult<TickSummary> {
        self.tick_count += 1;
        let mut summary = TickSummary::default();

        if now >= self.env.next_read_at {
            self.sample_environment(now, &mut summary);
            self.env.next_read_at = now.saturating_add(self.env.period_ms);
        }

        if let Some(warning) = self.environment.check_stale(now) {
            self.emit(MonitorEvent::EnvironmentStale {
                last_valid_at: warning.last_valid_at,
                timestamp: warning.detected_at,
            });
        }
        let drift_factor = self.environment.drift_factor(now);

        for index in 0..self.gas.len() {
            self.sample_gas(index, now, drift_factor, &mut summary)?;
        }

        let aggregate = self.classifier.aggregate();
        if aggregate != self.aggregate {
            info!(level = %aggregate.level, unknown = aggregate.unknown.len(), "aggregate air quality changed");
            self.emit(MonitorEvent::AggregateChanged {
                level: aggregate.level,
                unknown: aggregate.unknown.clone(),
                timestamp: now,
            });
            self.aggregate = aggregate;
        }

        trace!(tick = self.tick_count, drift_factor, "sampling tick");
        Ok(summary)
    }

    fn sample_environment(&mut self, now: Timestamp, summary: &mut TickSummary) {
        summary.environment_read = true;
        match read_with_retry(&mut self.env.channel) {
            Ok(reading) => {
                if self.env.faulted {
                    self.env.faulted = false;
                    info!(channel = %ChannelId::Environment, "environment sensor recovered");
                    self.emit(MonitorEvent::SensorRecovered {
                        channel_id: ChannelId::Environment,
                    });
                }
                debug!(
                    humidity = reading.humidity_percent,
                    temperature = reading.temperature_celsius,
                    "environment sample"
                );
                self.environment.record(EnvironmentSample::from_reading(reading, now));
            }
            Err(e) => {
                summary.faulted.push(ChannelId::Environment);
                self.environment.record(EnvironmentSample::invalid(now));
                if !self.env.faulted {
                    self.env.faulted = true;
                    warn!(channel = %ChannelId::Environment, error = %e, "sensor fault");
                    self.emit(MonitorEvent::SensorFault {
                        channel_id: ChannelId::Environment,
                    });
                }
            }
        }
    }

    fn sample_gas(
        &mut self,
        index: usize,
        now: Timestamp,
        drift_factor: f32,
        summary: &mut TickSummary,
    ) -> OrchestrationResult<()> {
        let slot = &mut self.gas[index];
        let id = slot.id;
        let channel_id = slot.channel.channel_id();

        let sample = match read_with_retry(&mut slot.channel) {
            Ok(raw) => RawSample::new(channel_id, raw, now),
            Err(e) => {
                summary.faulted.push(channel_id);
                let first = !slot.faulted;
                slot.faulted = true;
                slot.trusted = false;
                if first {
                    warn!(sensor = %id, name = %slot.name, channel = %channel_id, error = %e, "sensor fault");
                    self.emit(MonitorEvent::SensorFault { channel_id });
                }
                self.calibration.interrupt(id)?;
                return self.force_unknown(id, now);
            }
        };

        if slot.faulted {
            slot.faulted = false;
            info!(sensor = %id, channel = %channel_id, "sensor recovered");
            self.emit(MonitorEvent::SensorRecovered { channel_id });
        }

        trace!(sensor = %id, raw = sample.raw_value, volts = sample.voltage(), "raw sample");

        // Estado do aquecedor lido depois da leitura: um fail-safe no meio da
        // rodada já vale para este sensor
        let slot = &mut self.gas[index];
        let trusted = self.heater.trusts(slot.warmup_ms, now);
        if !trusted {
            if slot.trusted {
                slot.trusted = false;
                debug!(sensor = %id, "heater no longer trusted");
                self.calibration.interrupt(id)?;
            }
            return self.force_unknown(id, now);
        }
        slot.trusted = true;
        summary.trusted.push(id);

        self.calibration.on_heater_steady(id)?;
        let reading = self
            .calibration
            .compensate(id, sample.raw_value, drift_factor, sample.timestamp);
        match self.calibration.observe(&reading)? {
            CalibrationOutcome::Completed(baseline) => {
                self.emit(MonitorEvent::CalibrationCompleted {
                    sensor_id: id,
                    baseline_value: baseline.baseline_value,
                    sample_count: baseline.sample_count,
                });
            }
            CalibrationOutcome::Unstable { attempt, variance } => {
                self.emit(MonitorEvent::CalibrationUnstable {
                    sensor_id: id,
                    attempt,
                    variance,
                });
            }
            CalibrationOutcome::Exhausted { attempts, variance } => {
                self.emit(MonitorEvent::CalibrationUnstable {
                    sensor_id: id,
                    attempt: attempts,
                    variance,
                });
                self.emit(MonitorEvent::CalibrationExhausted {
                    sensor_id: id,
                    attempts,
                });
            }
            CalibrationOutcome::Idle
            | CalibrationOutcome::Accumulating { .. }
            | CalibrationOutcome::Monitoring => {}
        }

        let Some(baseline) = self.calibration.baseline(id) else {
            return self.force_unknown(id, now);
        };
        let classification = self.classifier.classify(&reading, &baseline)?;
        self.emit(MonitorEvent::SampleClassified {
            sensor_id: id,
            level: classification.level,
            compensated_value: reading.compensated_value,
            timestamp: now,
        });
        if let Some(change) = classification.change {
            self.emit_level_change(change, now);
        }
        Ok(())
    }

    fn force_unknown(&mut self, id: SensorId, now: Timestamp) -> OrchestrationResult<()> {
        if let Some(change) = self.classifier.mark_unknown(id)? {
            self.emit_level_change(change, now);
        }
        Ok(())
    }

    fn emit_level_change(&self, change: LevelChange, now: Timestamp) {
        self.emit(MonitorEvent::LevelChanged {
            sensor_id: change.sensor_id,
            from: change.from,
            to: change.to,
            timestamp: now,
        });
    }

    fn emit(&self, event: MonitorEvent) {
        self.sink.emit(event);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONSULTA / OPERADOR
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn level(&self, sensor: SensorId) -> AirQualityLevel {
        self.classifier.level(sensor)
    }

    pub fn aggregate(&self) -> &AggregateLevel {
        &self.aggregate
    }

    pub fn baseline(&self, sensor: SensorId) -> Option<SensorBaseline> {
        self.calibration.baseline(sensor)
    }

    pub fn calibration(&self) -> &CalibrationTracker {
        &self.calibration
    }

    pub fn environment(&self) -> &EnvironmentMonitor {
        &self.environment
    }

    pub fn classifier(&self) -> &AirQualityClassifier {
        &self.classifier
    }

    /// Todos os sensores voltam a calibrar no próximo estado confiável
    pub fn request_recalibration(&mut self) {
        self.calibration.request_recalibration_all();
    }

    pub fn export_baseline(&self) -> BaselineSnapshot {
        self.calibration.export_baseline()
    }

    pub fn import_baseline(&mut self, snapshot: &BaselineSnapshot) -> OrchestrationResult<usize> {
        Ok(self.calibration.import_baseline(snapshot)?)
    }
}

impl<G, E> std::fmt::Debug for SamplingEngine<G, E>
where
    G: HardwareChannel<Reading = u16>,
    E: HardwareChannel<Reading = ClimateReading>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingEngine")
            .field("sensors", &self.gas.len())
            .field("tick_count", &self.tick_count)
            .field("aggregate", &self.aggregate)
            .finish()
    }
}

/// Leitura com uma nova tentativa imediata
fn read_with_retry<C: HardwareChannel>(channel: &mut C) -> Result<C::Reading, ChannelError> {
    match channel.read() {
        Ok(value) => Ok(value),
        Err(first) => {
            debug!(channel = %channel.channel_id(), error = %first, "read failed, retrying");
            channel.read()
        }
    }
}
