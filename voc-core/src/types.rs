//! Tipos de dados compartilhados entre as camadas

use std::fmt;
use serde::{Deserialize, Serialize};

/// Timestamp monotônico em milissegundos desde a origem do relógio
pub type Timestamp = u64;

/// Valor máximo do ADC de 10 bits (MCP3008)
pub const ADC_MAX: u16 = 1023;

/// Número de canais do MCP3008
pub const ADC_CHANNELS: u8 = 8;

/// Tensão de referência do ADC (V)
pub const ADC_VREF: f32 = 3.3;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFICADORES
// ═══════════════════════════════════════════════════════════════════════════════

/// Canal físico de entrada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    /// Canal analógico do ADC (0-7)
    Analog(u8),
    /// Sensor digital de umidade/temperatura (single-wire)
    Environment,
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Analog(index) => write!(f, "adc{index}"),
            ChannelId::Environment => write!(f, "env"),
        }
    }
}

/// Sensor de gás, identificado pela posição na rodada de amostragem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorId(pub u8);

impl SensorId {
    /// Índice na rodada (0 = primeiro sensor)
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gas{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AMOSTRAS
// ═══════════════════════════════════════════════════════════════════════════════

/// Amostra bruta de um canal analógico. Imutável depois de produzida.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub channel: ChannelId,
    /// Valor do ADC (0-1023)
    pub raw_value: u16,
    pub timestamp: Timestamp,
}

impl RawSample {
    pub fn new(channel: ChannelId, raw_value: u16, timestamp: Timestamp) -> Self {
        Self {
            channel,
            raw_value,
            timestamp,
        }
    }

    /// Tensão no pino do ADC (V)
    pub fn voltage(&self) -> f32 {
        raw_to_voltage(self.raw_value)
    }

    /// Razão Rs/RL do divisor de carga do sensor MQ
    pub fn resistance_ratio(&self) -> Option<f32> {
        resistance_ratio(self.voltage())
    }
}

/// Converte valor do ADC em tensão
pub fn raw_to_voltage(raw: u16) -> f32 {
    raw.min(ADC_MAX) as f32 / ADC_MAX as f32 * ADC_VREF
}

/// Razão Rs/RL a partir da tensão medida sobre RL
///
/// Retorna `None` para tensão nula (sensor desconectado ou aquecedor frio).
pub fn resistance_ratio(voltage: f32) -> Option<f32> {
    if voltage <= 0.0 {
        return None;
    }
    Some((ADC_VREF - voltage) / voltage)
}

/// Leitura atômica do sensor digital de umidade/temperatura
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    pub humidity_percent: f32,
    pub temperature_celsius: f32,
}

/// Amostra ambiental
///
/// `valid = false` quando a leitura falhou; consumidores usam a última amostra
/// válida.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSample {
    pub humidity_percent: f32,
    pub temperature_celsius: f32,
    pub timestamp: Timestamp,
    pub valid: bool,
}

impl EnvironmentSample {
    pub fn from_reading(reading: ClimateReading, timestamp: Timestamp) -> Self {
        Self {
            humidity_percent: reading.humidity_percent,
            temperature_celsius: reading.temperature_celsius,
            timestamp,
            valid: true,
        }
    }

    /// Amostra marcando falha de comunicação
    pub fn invalid(timestamp: Timestamp) -> Self {
        Self {
            humidity_percent: f32::NAN,
            temperature_celsius: f32::NAN,
            timestamp,
            valid: false,
        }
    }
}

/// Leitura compensada. Derivada, recalculada sob demanda.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompensatedReading {
    pub sensor_id: SensorId,
    pub raw_value: u16,
    pub compensated_value: f32,
    pub drift_factor: f32,
    pub timestamp: Timestamp,
}

/// Baseline de ar limpo de um sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorBaseline {
    pub sensor_id: SensorId,
    pub baseline_value: f32,
    pub last_updated: Timestamp,
    pub sample_count: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NÍVEIS DE QUALIDADE DO AR
// ═══════════════════════════════════════════════════════════════════════════════

/// Nível de qualidade do ar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AirQualityLevel {
    Good,
    Moderate,
    Poor,
    Alert,
    /// Sensor sem leitura confiável (falha, aquecedor, calibração)
    Unknown,
}

impl AirQualityLevel {
    /// Severidade (0 = Good .. 3 = Alert); `None` para Unknown
    pub fn severity(&self) -> Option<u8> {
        match self {
            AirQualityLevel::Good => Some(0),
            AirQualityLevel::Moderate => Some(1),
            AirQualityLevel::Poor => Some(2),
            AirQualityLevel::Alert => Some(3),
            AirQualityLevel::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.severity().is_some()
    }

    /// Pior de dois níveis conhecidos; Unknown é ignorado
    pub fn worst(self, other: AirQualityLevel) -> AirQualityLevel {
        match (self.severity(), other.severity()) {
            (Some(a), Some(b)) => {
                if b > a {
                    other
                } else {
                    self
                }
            }
            (Some(_), None) => self,
            (None, _) => other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AirQualityLevel::Good => "GOOD",
            AirQualityLevel::Moderate => "MODERATE",
            AirQualityLevel::Poor => "POOR",
            AirQualityLevel::Alert => "ALERT",
            AirQualityLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AirQualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Nível agregado do sistema (pior dos sensores conhecidos)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateLevel {
    pub level: AirQualityLevel,
    /// Sensores excluídos do agregado por estarem em Unknown
    pub unknown: Vec<SensorId>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// AQUECEDOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Modo do aquecedor compartilhado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaterMode {
    /// Desligado (antes de `start` ou após shutdown)
    Off,
    Warmup,
    Steady,
    /// Falha na linha de controle; exige reset explícito
    FailSafe,
}

impl fmt::Display for HeaterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeaterMode::Off => "OFF",
            HeaterMode::Warmup => "WARMUP",
            HeaterMode::Steady => "STEADY",
            HeaterMode::FailSafe => "FAIL_SAFE",
        };
        f.write_str(s)
    }
}

/// Snapshot do estado do aquecedor (uma instância para os dois sensores)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaterState {
    pub is_energized: bool,
    /// Início do ciclo atual (entrada no modo corrente ou no período de duty)
    pub cycle_started_at: Timestamp,
    pub mode: HeaterMode,
    /// Início do período de aquecimento contínuo (entrada em Warmup)
    pub warmup_started_at: Timestamp,
}

impl HeaterState {
    pub const OFF: HeaterState = HeaterState {
        is_energized: false,
        cycle_started_at: 0,
        mode: HeaterMode::Off,
        warmup_started_at: 0,
    };

    /// Tempo de aquecimento decorrido (ms); zero fora de Warmup/Steady
    pub fn heated_for(&self, now: Timestamp) -> u64 {
        match self.mode {
            HeaterMode::Warmup | HeaterMode::Steady => now.saturating_sub(self.warmup_started_at),
            HeaterMode::Off | HeaterMode::FailSafe => 0,
        }
    }

    /// Leituras de um sensor com aquecimento `warmup_ms` são confiáveis?
    pub fn trusts(&self, warmup_ms: u64, now: Timestamp) -> bool {
        self.mode == HeaterMode::Steady && self.heated_for(now) >= warmup_ms
    }
}

impl Default for HeaterState {
    fn default() -> Self {
        Self::OFF
    }
}
