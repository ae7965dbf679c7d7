//! # Classificação da qualidade do ar
//!
//! Nível instantâneo pela razão `valor compensado / baseline`:
//!
//! | Razão | Nível |
//! |:------|:------|
//! | < moderate (1.2) | GOOD |
//! | < poor (1.5) | MODERATE |
//! | < alert (2.0) | POOR |
//! | demais | ALERT |
//!
//! O nível reportado passa por histerese: subir é imediato; descer exige
//! `hysteresis_sample_count` amostras consecutivas abaixo do nível atual, e o
//! novo nível é o pior observado nessa sequência.
//!
//! Um sensor forçado a UNKNOWN (falha, aquecedor) guarda o último nível
//! conhecido: na volta, subir continua imediato e descer abaixo dele continua
//! exigindo a sequência completa.

use serde::{Deserialize, Serialize};
use tracing::info;
use voc_core::{
    AggregateLevel, AirQualityLevel, CompensatedReading, MonitorConfig, SensorBaseline, SensorId,
    ThresholdRatios,
};

use crate::error::{OlfactoryError, OlfactoryResult};

/// Nível para uma razão sobre a baseline
pub fn classify_ratio(ratio: f32, thresholds: &ThresholdRatios) -> AirQualityLevel {
    if !ratio.is_finite() {
        return AirQualityLevel::Unknown;
    }
    if ratio < thresholds.moderate {
        AirQualityLevel::Good
    } else if ratio < thresholds.poor {
        AirQualityLevel::Moderate
    } else if ratio < thresholds.alert {
        AirQualityLevel::Poor
    } else {
        AirQualityLevel::Alert
    }
}

/// Nível instantâneo de uma leitura, sem histerese
pub fn classify(
    reading: &CompensatedReading,
    baseline: &SensorBaseline,
    thresholds: &ThresholdRatios,
) -> AirQualityLevel {
    if !(baseline.baseline_value > 0.0) {
        return AirQualityLevel::Unknown;
    }
    classify_ratio(reading.compensated_value / baseline.baseline_value, thresholds)
}

/// Máquina de histerese de um sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hysteresis {
    Unknown,
    /// Reportando UNKNOWN; `last` é o nível conhecido antes da interrupção
    Suspended { last: AirQualityLevel },
    Stable(AirQualityLevel),
    /// Sequência de amostras abaixo de `current`; `worst` é o pior nível da sequência
    Descending {
        current: AirQualityLevel,
        worst: AirQualityLevel,
        count: u32,
    },
}

impl Hysteresis {
    /// Nível reportado
    pub fn reported(&self) -> AirQualityLevel {
        match *self {
            Hysteresis::Unknown | Hysteresis::Suspended { .. } => AirQualityLevel::Unknown,
            Hysteresis::Stable(level) => level,
            Hysteresis::Descending { current, .. } => current,
        }
    }

    /// Passa a reportar UNKNOWN sem perder o último nível conhecido
    pub fn suspend(self) -> Self {
        match self {
            Hysteresis::Unknown | Hysteresis::Suspended { .. } => self,
            Hysteresis::Stable(last) | Hysteresis::Descending { current: last, .. } => {
                Hysteresis::Suspended { last }
            }
        }
    }

    /// Próximo estado dado um nível instantâneo
    pub fn step(self, observed: AirQualityLevel, required: u32) -> Self {
        let Some(observed_sev) = observed.severity() else {
            return self.suspend();
        };
        let (current, worst, count) = match self {
            Hysteresis::Unknown => return Hysteresis::Stable(observed),
            Hysteresis::Suspended { last: current } | Hysteresis::Stable(current) => {
                (current, observed, 0)
            }
            Hysteresis::Descending {
                current,
                worst,
                count,
            } => (current, worst.worst(observed), count),
        };

        let current_sev = current.severity().unwrap_or(0);
        if observed_sev > current_sev {
            return Hysteresis::Stable(observed);
        }
        if observed_sev == current_sev {
            return Hysteresis::Stable(current);
        }

        let count = count + 1;
        if count >= required {
            Hysteresis::Stable(worst)
        } else {
            Hysteresis::Descending {
                current,
                worst,
                count,
            }
        }
    }
}

/// Mudança do nível reportado de um sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub sensor_id: SensorId,
    pub from: AirQualityLevel,
    pub to: AirQualityLevel,
}

/// Resultado de uma classificação
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub sensor_id: SensorId,
    /// Nível da amostra isolada
    pub instantaneous: AirQualityLevel,
    /// Nível reportado após histerese
    pub level: AirQualityLevel,
    pub change: Option<LevelChange>,
}

#[derive(Debug, Clone)]
struct SensorLevel {
    thresholds: ThresholdRatios,
    state: Hysteresis,
}

/// Classificador com histerese por sensor e nível agregado
#[derive(Debug, Clone)]
pub struct AirQualityClassifier {
    hysteresis_count: u32,
    sensors: Vec<SensorLevel>,
}

impl AirQualityClassifier {
    pub fn new(thresholds: Vec<ThresholdRatios>, hysteresis_count: u32) -> OlfactoryResult<Self> {
        if hysteresis_count == 0 {
            return Err(OlfactoryError::InvalidConfig(
                "hysteresis_sample_count must be > 0".into(),
            ));
        }
        let sensors = thresholds
            .into_iter()
            .map(|thresholds| -> OlfactoryResult<SensorLevel> {
                thresholds.validate()?;
                Ok(SensorLevel {
                    thresholds,
                    state: Hysteresis::Unknown,
                })
            })
            .collect::<OlfactoryResult<Vec<_>>>()?;
        Ok(Self {
            hysteresis_count,
            sensors,
        })
    }

    pub fn from_config(config: &MonitorConfig) -> OlfactoryResult<Self> {
        Self::new(
            config.sensors.iter().map(|s| s.thresholds).collect(),
            config.hysteresis_sample_count,
        )
    }

    pub fn thresholds(&self, sensor: SensorId) -> OlfactoryResult<&ThresholdRatios> {
        Ok(&self.slot(sensor)?.thresholds)
    }

    /// Classifica uma leitura confiável e atualiza a histerese do sensor
    pub fn classify(
        &mut self,
        reading: &CompensatedReading,
        baseline: &SensorBaseline,
    ) -> OlfactoryResult<Classification> {
        let required = self.hysteresis_count;
        let sensor_id = reading.sensor_id;
        let slot = self.slot_mut(sensor_id)?;

        let instantaneous = classify(reading, baseline, &slot.thresholds);
        let from = slot.state.reported();
        slot.state = slot.state.step(instantaneous, required);
        let level = slot.state.reported();

        let change = (from != level).then(|| {
            info!(sensor = %sensor_id, %from, to = %level, "air quality level changed");
            LevelChange {
                sensor_id,
                from,
                to: level,
            }
        });
        Ok(Classification {
            sensor_id,
            instantaneous,
            level,
            change,
        })
    }

    /// Força UNKNOWN (falha, aquecedor, sem baseline)
    pub fn mark_unknown(&mut self, sensor: SensorId) -> OlfactoryResult<Option<LevelChange>> {
        let slot = self.slot_mut(sensor)?;
        let from = slot.state.reported();
        slot.state = slot.state.suspend();
        Ok((from != AirQualityLevel::Unknown).then_some(LevelChange {
            sensor_id: sensor,
            from,
            to: AirQualityLevel::Unknown,
        }))
    }

    pub fn level(&self, sensor: SensorId) -> AirQualityLevel {
        self.sensors
            .get(sensor.index())
            .map(|s| s.state.reported())
            .unwrap_or(AirQualityLevel::Unknown)
    }

    pub fn hysteresis(&self, sensor: SensorId) -> Option<Hysteresis> {
        self.sensors.get(sensor.index()).map(|s| s.state)
    }

    /// Pior dos níveis conhecidos; sensores UNKNOWN ficam de fora
    pub fn aggregate(&self) -> AggregateLevel {
        let mut level = AirQualityLevel::Unknown;
        let mut unknown = Vec::new();
        for (i, sensor) in self.sensors.iter().enumerate() {
            let reported = sensor.state.reported();
            if reported.is_known() {
                level = level.worst(reported);
            } else {
                unknown.push(SensorId(i as u8));
            }
        }
        AggregateLevel { level, unknown }
    }

    fn slot(&self, sensor: SensorId) -> OlfactoryResult<&SensorLevel> {
        self.sensors
            .get(sensor.index())
            .ok_or(OlfactoryError::UnknownSensor(sensor))
    }

    fn slot_mut(&mut self, sensor: SensorId) -> OlfactoryResult<&mut SensorLevel> {
        self.sensors
            .get_mut(sensor.index())
            .ok_or(OlfactoryError::UnknownSensor(sensor))
    }
}
