//! Eventos emitidos pelo núcleo para consumidores externos (display, log)

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::{AirQualityLevel, ChannelId, HeaterMode, SensorId, Timestamp};

/// Evento do monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Leitura confiável classificada
    SampleClassified {
        sensor_id: SensorId,
        level: AirQualityLevel,
        compensated_value: f32,
        timestamp: Timestamp,
    },
    /// Nível reportado de um sensor mudou
    LevelChanged {
        sensor_id: SensorId,
        from: AirQualityLevel,
        to: AirQualityLevel,
        timestamp: Timestamp,
    },
    /// Nível agregado (pior dos sensores conhecidos) mudou
    AggregateChanged {
        level: AirQualityLevel,
        unknown: Vec<SensorId>,
        timestamp: Timestamp,
    },
    /// Duas falhas consecutivas no mesmo canal
    SensorFault { channel_id: ChannelId },
    /// Canal voltou a responder após uma falha
    SensorRecovered { channel_id: ChannelId },
    /// Tentativa de calibração rejeitada por variância alta
    CalibrationUnstable {
        sensor_id: SensorId,
        attempt: u32,
        variance: f32,
    },
    /// Limite de tentativas atingido; exige recalibração do operador
    CalibrationExhausted { sensor_id: SensorId, attempts: u32 },
    /// Baseline nova aceita
    CalibrationCompleted {
        sensor_id: SensorId,
        baseline_value: f32,
        sample_count: u32,
    },
    /// Amostra ambiental mais antiga que o timeout; fator de drift = 1.0
    EnvironmentStale {
        last_valid_at: Option<Timestamp>,
        timestamp: Timestamp,
    },
    HeaterModeChanged {
        from: HeaterMode,
        to: HeaterMode,
        timestamp: Timestamp,
    },
    /// Falha na linha do aquecedor; aquecedor forçado a OFF
    HeaterFailSafe { reason: String },
}

/// Categoria de evento, usada em filtros
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Classification,
    Fault,
    Calibration,
    Environment,
    Heater,
}

impl MonitorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MonitorEvent::SampleClassified { .. }
            | MonitorEvent::LevelChanged { .. }
            | MonitorEvent::AggregateChanged { .. } => EventKind::Classification,
            MonitorEvent::SensorFault { .. } | MonitorEvent::SensorRecovered { .. } => {
                EventKind::Fault
            }
            MonitorEvent::CalibrationUnstable { .. }
            | MonitorEvent::CalibrationExhausted { .. }
            | MonitorEvent::CalibrationCompleted { .. } => EventKind::Calibration,
            MonitorEvent::EnvironmentStale { .. } => EventKind::Environment,
            MonitorEvent::HeaterModeChanged { .. } | MonitorEvent::HeaterFailSafe { .. } => {
                EventKind::Heater
            }
        }
    }

    /// Sensor ao qual o evento se refere, se houver
    pub fn sensor(&self) -> Option<SensorId> {
        match self {
            MonitorEvent::SampleClassified { sensor_id, .. }
            | MonitorEvent::LevelChanged { sensor_id, .. }
            | MonitorEvent::CalibrationUnstable { sensor_id, .. }
            | MonitorEvent::CalibrationExhausted { sensor_id, .. }
            | MonitorEvent::CalibrationCompleted { sensor_id, .. } => Some(*sensor_id),
            _ => None,
        }
    }
}

/// Destino de eventos (display, logger, barramento)
pub trait EventSink: Send + Sync + Debug {
    fn emit(&self, event: MonitorEvent);
}

/// Coletor em memória
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<MonitorEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Remove e retorna os eventos coletados
    pub fn drain(&self) -> Vec<MonitorEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: MonitorEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
