//! # Baseline de ar limpo por sensor
//!
//! ```text
//!  AWAITING_HEATER ──(primeiro STEADY confiável)──▶ CALIBRATING{attempt}
//!        │ baseline importada, sem pedido de recalibração        │
//!        ▼                                                       │ N amostras
//!   MONITORING ◀──────────── variância ≤ limite ─────────────────┤
//!        │                                                       │ variância > limite
//!        │ recalibração                        attempt < máx ◀───┤
//!        ▼                                                       ▼
//!  AWAITING_HEATER{forced}                          EXHAUSTED (aviso persistente)
//! ```
//!
//! A baseline é a média aritmética de exatamente `sample_count` leituras
//! compensadas consecutivas. Uma tentativa com variância populacional acima do
//! limite é descartada sem tocar na baseline. Falhas de leitura ou perda de
//! confiança no aquecedor zeram a tentativa corrente sem consumi-la.
//!
//! A baseline anterior continua valendo enquanto uma recalibração está em curso.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voc_core::{CompensatedReading, MonitorConfig, SensorBaseline, SensorId, Timestamp};

use crate::error::{OlfactoryError, OlfactoryResult};

/// Parâmetros de calibração
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub sample_count: u32,
    pub variance_threshold: f32,
    pub max_attempts: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sample_count: 30,
            variance_threshold: 25.0,
            max_attempts: 3,
        }
    }
}

impl CalibrationConfig {
    pub fn from_monitor(config: &MonitorConfig) -> Self {
        Self {
            sample_count: config.calibration_sample_count,
            variance_threshold: config.calibration_variance_threshold,
            max_attempts: config.calibration_max_attempts,
        }
    }

    pub fn validate(&self) -> OlfactoryResult<()> {
        if self.sample_count == 0 {
            return Err(OlfactoryError::InvalidConfig("sample_count must be > 0".into()));
        }
        if self.max_attempts == 0 {
            return Err(OlfactoryError::InvalidConfig("max_attempts must be > 0".into()));
        }
        if !(self.variance_threshold >= 0.0) {
            return Err(OlfactoryError::InvalidConfig(
                "variance_threshold must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// Fase de calibração de um sensor
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationPhase {
    /// Esperando o primeiro estado confiável do aquecedor.
    /// `forced` ignora uma baseline existente.
    AwaitingHeater { forced: bool },
    /// Acumulando leituras para a tentativa `attempt` (1-based)
    Calibrating { attempt: u32, samples: Vec<f32> },
    Monitoring,
    /// Tentativas esgotadas; exige recalibração do operador
    Exhausted { attempts: u32 },
}

/// Resultado de uma observação
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// Sensor não está calibrando nem monitorando
    Idle,
    Accumulating { attempt: u32, collected: u32 },
    Completed(SensorBaseline),
    /// Tentativa rejeitada; a próxima já começou
    Unstable { attempt: u32, variance: f32 },
    /// Última tentativa rejeitada
    Exhausted { attempts: u32, variance: f32 },
    Monitoring,
}

/// Snapshot serializável das baselines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub baselines: Vec<SensorBaseline>,
}

#[derive(Debug, Clone)]
struct SensorCalibration {
    phase: CalibrationPhase,
    baseline: Option<SensorBaseline>,
}

/// Dono exclusivo das baselines
#[derive(Debug, Clone)]
pub struct CalibrationTracker {
    config: CalibrationConfig,
    sensors: Vec<SensorCalibration>,
}

impl CalibrationTracker {
    pub fn new(config: CalibrationConfig, sensor_count: usize) -> OlfactoryResult<Self> {
        config.validate()?;
        let sensors = (0..sensor_count)
            .map(|_| SensorCalibration {
                phase: CalibrationPhase::AwaitingHeater { forced: false },
                baseline: None,
            })
            .collect();
        Ok(Self { config, sensors })
    }

    pub fn from_config(config: &MonitorConfig) -> OlfactoryResult<Self> {
        Self::new(CalibrationConfig::from_monitor(config), config.sensors.len())
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn phase(&self, sensor: SensorId) -> OlfactoryResult<&CalibrationPhase> {
        Ok(&self.slot(sensor)?.phase)
    }

    pub fn baseline(&self, sensor: SensorId) -> Option<SensorBaseline> {
        self.sensors.get(sensor.index()).and_then(|s| s.baseline)
    }

    /// Leitura compensada: `raw × drift_factor`
    pub fn compensate(
        &self,
        sensor: SensorId,
        raw_value: u16,
        drift_factor: f32,
        timestamp: Timestamp,
    ) -> CompensatedReading {
        CompensatedReading {
            sensor_id: sensor,
            raw_value,
            compensated_value: raw_value as f32 * drift_factor,
            drift_factor,
            timestamp,
        }
    }

    /// O aquecedor passou a ser confiável para este sensor
    pub fn on_heater_steady(&mut self, sensor: SensorId) -> OlfactoryResult<&CalibrationPhase> {
        let slot = self.slot_mut(sensor)?;
        if let CalibrationPhase::AwaitingHeater { forced } = slot.phase {
            slot.phase = if !forced && slot.baseline.is_some() {
                debug!(%sensor, "using existing baseline");
                CalibrationPhase::Monitoring
            } else {
                info!(%sensor, attempt = 1, "baseline calibration started");
                CalibrationPhase::Calibrating {
                    attempt: 1,
                    samples: Vec::new(),
                }
            };
        }
        Ok(&slot.phase)
    }

    /// Alimenta uma leitura compensada confiável
    pub fn observe(&mut self, reading: &CompensatedReading) -> OlfactoryResult<CalibrationOutcome> {
        let config = self.config;
        let sensor = reading.sensor_id;
        let slot = self.slot_mut(sensor)?;

        let (attempt, samples) = match &mut slot.phase {
            CalibrationPhase::Calibrating { attempt, samples } => (*attempt, samples),
            CalibrationPhase::Monitoring => return Ok(CalibrationOutcome::Monitoring),
            CalibrationPhase::AwaitingHeater { .. } | CalibrationPhase::Exhausted { .. } => {
                return Ok(CalibrationOutcome::Idle);
            }
        };

        samples.push(reading.compensated_value);
        let collected = samples.len() as u32;
        if collected < config.sample_count {
            return Ok(CalibrationOutcome::Accumulating { attempt, collected });
        }

        let (mean, variance) = mean_and_variance(samples);
        if variance > config.variance_threshold {
            if attempt >= config.max_attempts {
                warn!(%sensor, attempts = attempt, variance, "baseline calibration exhausted");
                slot.phase = CalibrationPhase::Exhausted { attempts: attempt };
                return Ok(CalibrationOutcome::Exhausted {
                    attempts: attempt,
                    variance,
                });
            }
            warn!(%sensor, attempt, variance, "baseline calibration unstable, retrying");
            slot.phase = CalibrationPhase::Calibrating {
                attempt: attempt + 1,
                samples: Vec::new(),
            };
            return Ok(CalibrationOutcome::Unstable { attempt, variance });
        }

        let baseline = SensorBaseline {
            sensor_id: sensor,
            baseline_value: mean,
            last_updated: reading.timestamp,
            sample_count: collected,
        };
        info!(%sensor, baseline = mean, variance, attempt, "baseline calibrated");
        slot.baseline = Some(baseline);
        slot.phase = CalibrationPhase::Monitoring;
        Ok(CalibrationOutcome::Completed(baseline))
    }

    /// Quebra a sequência consecutiva (falha de leitura, aquecedor não
    /// confiável). A tentativa corrente recomeça do zero sem ser consumida.
    pub fn interrupt(&mut self, sensor: SensorId) -> OlfactoryResult<()> {
        let slot = self.slot_mut(sensor)?;
        if let CalibrationPhase::Calibrating { attempt, samples } = &mut slot.phase {
            if !samples.is_empty() {
                debug!(%sensor, attempt = *attempt, discarded = samples.len(), "calibration run interrupted");
                samples.clear();
            }
        }
        Ok(())
    }

    /// Pedido explícito de recalibração de um sensor
    pub fn request_recalibration(&mut self, sensor: SensorId) -> OlfactoryResult<()> {
        let slot = self.slot_mut(sensor)?;
        slot.phase = CalibrationPhase::AwaitingHeater { forced: true };
        info!(%sensor, "recalibration requested");
        Ok(())
    }

    pub fn request_recalibration_all(&mut self) {
        for slot in &mut self.sensors {
            slot.phase = CalibrationPhase::AwaitingHeater { forced: true };
        }
        info!(sensors = self.sensors.len(), "recalibration requested for all sensors");
    }

    pub fn export_baseline(&self) -> BaselineSnapshot {
        BaselineSnapshot {
            baselines: self.sensors.iter().filter_map(|s| s.baseline).collect(),
        }
    }

    /// Importa baselines. Um sensor com baseline importada vai direto para
    /// MONITORING no primeiro STEADY; uma calibração em curso é abandonada.
    pub fn import_baseline(&mut self, snapshot: &BaselineSnapshot) -> OlfactoryResult<usize> {
        for baseline in &snapshot.baselines {
            self.slot(baseline.sensor_id)?;
            if !baseline.baseline_value.is_finite() || baseline.baseline_value <= 0.0 {
                return Err(OlfactoryError::InvalidBaseline {
                    sensor: baseline.sensor_id,
                    reason: format!("value {} is not positive", baseline.baseline_value),
                });
            }
        }

        for baseline in &snapshot.baselines {
            let slot = &mut self.sensors[baseline.sensor_id.index()];
            slot.baseline = Some(*baseline);
            slot.phase = match slot.phase {
                CalibrationPhase::AwaitingHeater { .. } => {
                    CalibrationPhase::AwaitingHeater { forced: false }
                }
                _ => CalibrationPhase::Monitoring,
            };
            debug!(sensor = %baseline.sensor_id, value = baseline.baseline_value, "baseline imported");
        }
        Ok(snapshot.baselines.len())
    }

    fn slot(&self, sensor: SensorId) -> OlfactoryResult<&SensorCalibration> {
        self.sensors
            .get(sensor.index())
            .ok_or(OlfactoryError::UnknownSensor(sensor))
    }

    fn slot_mut(&mut self, sensor: SensorId) -> OlfactoryResult<&mut SensorCalibration> {
        self.sensors
            .get_mut(sensor.index())
            .ok_or(OlfactoryError::UnknownSensor(sensor))
    }
}

/// Média e variância populacional
pub fn mean_and_variance(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean as f32, variance as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let (mean, variance) = mean_and_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-6);
        assert!((variance - 4.0).abs() < 1e-6);
        assert_eq!(mean_and_variance(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_compensate_multiplies_drift() {
        let tracker = CalibrationTracker::new(CalibrationConfig::default(), 1).unwrap();
        let reading = tracker.compensate(SensorId(0), 200, 1.1, 42);
        assert!((reading.compensated_value - 220.0).abs() < 1e-4);
        assert_eq!(reading.drift_factor, 1.1);
        assert_eq!(reading.timestamp, 42);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = CalibrationConfig {
            sample_count: 0,
            ..CalibrationConfig::default()
        };
        assert!(CalibrationTracker::new(config, 2).is_err());
    }
}
