//! # Configuração do monitor
//!
//! Carregada de um arquivo TOML (todos os campos têm padrão) e sobrescrita por
//! variáveis `VOC_*` do ambiente ou de um `.env`.
//!
//! ```toml
//! tick_period_ms = 1000
//! heater_warmup_s = 60
//!
//! [[sensors]]
//! name = "MQ135"
//! adc_channel = 0
//! thresholds = { moderate = 1.2, poor = 1.5, alert = 2.0 }
//! ```

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ADC_CHANNELS, SensorId};

// Carrega o .env na primeira leitura de override
static DOTENV_INIT: Lazy<()> = Lazy::new(|| {
    let _ = dotenv::dotenv();
});

#[inline]
fn ensure_loaded() {
    let _ = &*DOTENV_INIT;
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

fn default_tick_period_ms() -> u64 {
    1000
}
fn default_env_sample_period_ms() -> u64 {
    10_000
}
fn default_env_stale_timeout_ms() -> u64 {
    30_000
}
fn default_channel_read_timeout_ms() -> u64 {
    100
}
fn default_heater_warmup_s() -> u64 {
    60
}
fn default_heater_duty_ratio() -> f32 {
    1.0
}
fn default_heater_duty_period_s() -> u64 {
    10
}
fn default_heater_tick_ms() -> u64 {
    250
}
fn default_calibration_sample_count() -> u32 {
    30
}
fn default_calibration_variance_threshold() -> f32 {
    25.0
}
fn default_calibration_max_attempts() -> u32 {
    3
}
fn default_hysteresis_sample_count() -> u32 {
    3
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEÇÕES
// ═══════════════════════════════════════════════════════════════════════════════

/// Limiares de razão sobre a baseline (valor / baseline)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRatios {
    pub moderate: f32,
    pub poor: f32,
    pub alert: f32,
}

impl Default for ThresholdRatios {
    fn default() -> Self {
        Self {
            moderate: 1.2,
            poor: 1.5,
            alert: 2.0,
        }
    }
}

impl ThresholdRatios {
    pub fn validate(&self) -> ConfigResult<()> {
        let ordered = self.moderate > 0.0 && self.moderate < self.poor && self.poor < self.alert;
        if !ordered || !self.alert.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "thresholds must be positive and strictly increasing, got {} / {} / {}",
                self.moderate, self.poor, self.alert
            )));
        }
        Ok(())
    }
}

/// Ponto de uma curva de correção: fator aplicado na abscissa `at`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftPoint {
    pub at: f32,
    pub factor: f32,
}

impl DriftPoint {
    pub const fn new(at: f32, factor: f32) -> Self {
        Self { at, factor }
    }
}

/// Tabela de correção de drift: curva de umidade × curva de temperatura.
///
/// Referência (fator 1.0): 20°C / 65%RH.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftTableConfig {
    pub humidity: Vec<DriftPoint>,
    pub temperature: Vec<DriftPoint>,
}

impl Default for DriftTableConfig {
    fn default() -> Self {
        Self {
            humidity: vec![
                DriftPoint::new(33.0, 1.08),
                DriftPoint::new(65.0, 1.0),
                DriftPoint::new(85.0, 0.96),
            ],
            temperature: vec![
                DriftPoint::new(-10.0, 1.15),
                DriftPoint::new(0.0, 1.10),
                DriftPoint::new(20.0, 1.0),
                DriftPoint::new(50.0, 0.90),
            ],
        }
    }
}

impl DriftTableConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_drift_curve(&self.humidity)
            .map_err(|e| ConfigError::Invalid(format!("drift humidity curve: {e}")))?;
        validate_drift_curve(&self.temperature)
            .map_err(|e| ConfigError::Invalid(format!("drift temperature curve: {e}")))
    }
}

/// Exige ao menos um ponto, abscissas estritamente crescentes e fatores
/// positivos formando uma sequência monotônica.
pub fn validate_drift_curve(points: &[DriftPoint]) -> Result<(), String> {
    if points.is_empty() {
        return Err("curve has no points".into());
    }
    if let Some(p) = points
        .iter()
        .find(|p| !p.at.is_finite() || !p.factor.is_finite() || p.factor <= 0.0)
    {
        return Err(format!(
            "point ({}, {}) must be finite with a positive factor",
            p.at, p.factor
        ));
    }
    if points.windows(2).any(|w| w[1].at <= w[0].at) {
        return Err("abscissas must be strictly increasing".into());
    }
    let non_increasing = points.windows(2).all(|w| w[1].factor <= w[0].factor);
    let non_decreasing = points.windows(2).all(|w| w[1].factor >= w[0].factor);
    if !non_increasing && !non_decreasing {
        return Err("factors must be monotonic".into());
    }
    Ok(())
}

/// Um sensor MQ na rodada de amostragem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasSensorConfig {
    pub name: String,
    /// Canal do MCP3008 (0-7)
    pub adc_channel: u8,
    /// Aquecimento documentado do sensor; padrão = `heater_warmup_s`
    #[serde(default)]
    pub warmup_s: Option<u64>,
    #[serde(default)]
    pub thresholds: ThresholdRatios,
}

impl GasSensorConfig {
    pub fn new(name: impl Into<String>, adc_channel: u8) -> Self {
        Self {
            name: name.into(),
            adc_channel,
            warmup_s: None,
            thresholds: ThresholdRatios::default(),
        }
    }
}

fn default_sensors() -> Vec<GasSensorConfig> {
    vec![GasSensorConfig::new("MQ135", 0), GasSensorConfig::new("MQ3", 1)]
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURAÇÃO
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuração completa do monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    #[serde(default = "default_env_sample_period_ms")]
    pub env_sample_period_ms: u64,

    /// Idade máxima da última amostra ambiental válida antes de desligar a compensação
    #[serde(default = "default_env_stale_timeout_ms")]
    pub env_stale_timeout_ms: u64,

    #[serde(default = "default_channel_read_timeout_ms")]
    pub channel_read_timeout_ms: u64,

    #[serde(default = "default_heater_warmup_s")]
    pub heater_warmup_s: u64,

    /// Fração ligada em STEADY (1.0 = contínuo)
    #[serde(default = "default_heater_duty_ratio")]
    pub heater_duty_ratio: f32,

    #[serde(default = "default_heater_duty_period_s")]
    pub heater_duty_period_s: u64,

    #[serde(default = "default_heater_tick_ms")]
    pub heater_tick_ms: u64,

    #[serde(default = "default_calibration_sample_count")]
    pub calibration_sample_count: u32,

    #[serde(default = "default_calibration_variance_threshold")]
    pub calibration_variance_threshold: f32,

    #[serde(default = "default_calibration_max_attempts")]
    pub calibration_max_attempts: u32,

    #[serde(default = "default_hysteresis_sample_count")]
    pub hysteresis_sample_count: u32,

    #[serde(default)]
    pub drift_correction_table: DriftTableConfig,

    /// Sensores na ordem fixa da rodada
    #[serde(default = "default_sensors")]
    pub sensors: Vec<GasSensorConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            env_sample_period_ms: default_env_sample_period_ms(),
            env_stale_timeout_ms: default_env_stale_timeout_ms(),
            channel_read_timeout_ms: default_channel_read_timeout_ms(),
            heater_warmup_s: default_heater_warmup_s(),
            heater_duty_ratio: default_heater_duty_ratio(),
            heater_duty_period_s: default_heater_duty_period_s(),
            heater_tick_ms: default_heater_tick_ms(),
            calibration_sample_count: default_calibration_sample_count(),
            calibration_variance_threshold: default_calibration_variance_threshold(),
            calibration_max_attempts: default_calibration_max_attempts(),
            hysteresis_sample_count: default_hysteresis_sample_count(),
            drift_correction_table: DriftTableConfig::default(),
            sensors: default_sensors(),
        }
    }
}

impl MonitorConfig {
    /// Interpreta e valida um documento TOML
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: MonitorConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Lê, interpreta e valida um arquivo TOML
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loading configuration");
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Aplica overrides `VOC_*` do ambiente (e do `.env`, se existir)
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        ensure_loaded();
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Aplica overrides a partir de uma função de busca e revalida
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        fn set<T: FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            slot: &mut T,
        ) -> ConfigResult<()> {
            if let Some(value) = lookup(key) {
                *slot = value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                    key: key.to_string(),
                    value: value.clone(),
                })?;
                debug!(key, value = %value, "configuration override");
            }
            Ok(())
        }

        set(&lookup, "VOC_TICK_PERIOD_MS", &mut self.tick_period_ms)?;
        set(&lookup, "VOC_ENV_SAMPLE_PERIOD_MS", &mut self.env_sample_period_ms)?;
        set(&lookup, "VOC_ENV_STALE_TIMEOUT_MS", &mut self.env_stale_timeout_ms)?;
        set(&lookup, "VOC_CHANNEL_READ_TIMEOUT_MS", &mut self.channel_read_timeout_ms)?;
        set(&lookup, "VOC_HEATER_WARMUP_S", &mut self.heater_warmup_s)?;
        set(&lookup, "VOC_HEATER_DUTY_RATIO", &mut self.heater_duty_ratio)?;
        set(&lookup, "VOC_HEATER_DUTY_PERIOD_S", &mut self.heater_duty_period_s)?;
        set(&lookup, "VOC_HEATER_TICK_MS", &mut self.heater_tick_ms)?;
        set(&lookup, "VOC_CALIBRATION_SAMPLE_COUNT", &mut self.calibration_sample_count)?;
        set(
            &lookup,
            "VOC_CALIBRATION_VARIANCE_THRESHOLD",
            &mut self.calibration_variance_threshold,
        )?;
        set(&lookup, "VOC_CALIBRATION_MAX_ATTEMPTS", &mut self.calibration_max_attempts)?;
        set(&lookup, "VOC_HYSTERESIS_SAMPLE_COUNT", &mut self.hysteresis_sample_count)?;
        self.validate()
    }

    /// Rejeita valores inconsistentes
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.tick_period_ms == 0 || self.heater_tick_ms == 0 {
            return invalid("tick periods must be > 0".into());
        }
        if self.env_sample_period_ms == 0 {
            return invalid("env_sample_period_ms must be > 0".into());
        }
        if self.channel_read_timeout_ms == 0 {
            return invalid("channel_read_timeout_ms must be > 0".into());
        }
        if !(self.heater_duty_ratio > 0.0 && self.heater_duty_ratio <= 1.0) {
            return invalid(format!(
                "heater_duty_ratio must be in (0, 1], got {}",
                self.heater_duty_ratio
            ));
        }
        if self.heater_duty_period_s == 0 {
            return invalid("heater_duty_period_s must be > 0".into());
        }
        if self.calibration_sample_count == 0 {
            return invalid("calibration_sample_count must be > 0".into());
        }
        if !(self.calibration_variance_threshold >= 0.0) {
            return invalid("calibration_variance_threshold must be >= 0".into());
        }
        if self.calibration_max_attempts == 0 {
            return invalid("calibration_max_attempts must be > 0".into());
        }
        if self.hysteresis_sample_count == 0 {
            return invalid("hysteresis_sample_count must be > 0".into());
        }
        if self.sensors.is_empty() {
            return invalid("at least one gas sensor is required".into());
        }
        if self.sensors.len() > u8::MAX as usize {
            return invalid("too many gas sensors".into());
        }

        let mut used = [false; ADC_CHANNELS as usize];
        for sensor in &self.sensors {
            let Some(slot) = used.get_mut(sensor.adc_channel as usize) else {
                return invalid(format!(
                    "sensor {} uses ADC channel {} (0-{})",
                    sensor.name,
                    sensor.adc_channel,
                    ADC_CHANNELS - 1
                ));
            };
            if *slot {
                return invalid(format!(
                    "ADC channel {} assigned to more than one sensor",
                    sensor.adc_channel
                ));
            }
            *slot = true;
            sensor.thresholds.validate()?;
        }
        self.drift_correction_table.validate()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACESSORES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn heater_tick(&self) -> Duration {
        Duration::from_millis(self.heater_tick_ms)
    }

    pub fn channel_read_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_read_timeout_ms)
    }

    pub fn heater_warmup_ms(&self) -> u64 {
        self.heater_warmup_s.saturating_mul(1000)
    }

    pub fn heater_duty_period_ms(&self) -> u64 {
        self.heater_duty_period_s.saturating_mul(1000)
    }

    /// Aquecimento exigido antes de confiar no sensor (ms)
    pub fn sensor_warmup_ms(&self, sensor: SensorId) -> u64 {
        self.sensors
            .get(sensor.index())
            .and_then(|s| s.warmup_s)
            .map(|s| s.saturating_mul(1000))
            .unwrap_or_else(|| self.heater_warmup_ms())
    }

    /// Sensores com seus identificadores na ordem da rodada
    pub fn sensor_ids(&self) -> impl Iterator<Item = (SensorId, &GasSensorConfig)> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, sensor)| (SensorId(i as u8), sensor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_period_ms, 1000);
        assert_eq!(config.env_sample_period_ms, 10_000);
        assert_eq!(config.heater_warmup_s, 60);
        assert_eq!(config.calibration_sample_count, 30);
        assert_eq!(config.hysteresis_sample_count, 3);
        assert_eq!(config.channel_read_timeout(), Duration::from_millis(100));
        assert_eq!(config.sensors.len(), 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = MonitorConfig::from_toml_str(
            r#"
            tick_period_ms = 500

            [[sensors]]
            name = "MQ2"
            adc_channel = 3
            warmup_s = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_period_ms, 500);
        assert_eq!(config.heater_warmup_s, 60);
        assert_eq!(config.sensors.len(), 1);
        assert_eq!(config.sensors[0].thresholds, ThresholdRatios::default());
        assert_eq!(config.sensor_warmup_ms(SensorId(0)), 120_000);
    }

    #[test]
    fn test_sensor_warmup_falls_back_to_heater() {
        let config = MonitorConfig::default();
        assert_eq!(config.sensor_warmup_ms(SensorId(1)), 60_000);
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = MonitorConfig::default();
        config.sensors[0].thresholds = ThresholdRatios {
            moderate: 1.5,
            poor: 1.2,
            alert: 2.0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_duplicate_adc_channel() {
        let mut config = MonitorConfig::default();
        config.sensors[1].adc_channel = 0;
        assert!(config.validate().is_err());

        config.sensors[1].adc_channel = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_drift_table() {
        let mut config = MonitorConfig::default();
        config.drift_correction_table.humidity = vec![
            DriftPoint::new(65.0, 1.0),
            DriftPoint::new(33.0, 1.08),
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("humidity"));

        let mut config = MonitorConfig::default();
        config.drift_correction_table.temperature = vec![
            DriftPoint::new(0.0, 1.1),
            DriftPoint::new(20.0, 0.9),
            DriftPoint::new(40.0, 1.2),
        ];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.drift_correction_table.temperature.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_duty_ratio() {
        let mut config = MonitorConfig::default();
        config.heater_duty_ratio = 0.0;
        assert!(config.validate().is_err());
        config.heater_duty_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [("VOC_TICK_PERIOD_MS", "250"), ("VOC_HEATER_DUTY_RATIO", "0.5")]
            .into_iter()
            .collect();
        let mut config = MonitorConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.tick_period_ms, 250);
        assert_eq!(config.heater_duty_ratio, 0.5);
    }

    #[test]
    fn test_override_rejects_garbage() {
        let mut config = MonitorConfig::default();
        let err = config
            .apply_overrides(|key| (key == "VOC_HEATER_WARMUP_S").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voc.toml");
        std::fs::write(&path, "hysteresis_sample_count = 5\n").unwrap();
        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.hysteresis_sample_count, 5);

        assert!(matches!(
            MonitorConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = MonitorConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(MonitorConfig::from_toml_str(&text).unwrap(), config);
    }
}
