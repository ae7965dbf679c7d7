//! # 👃 voc-olfactory - Baseline e classificação dos sensores MQ
//!
//! Converte leituras compensadas em níveis de qualidade do ar.
//!
//! ## Componentes
//!
//! ### CalibrationTracker
//!
//! Dono das baselines de ar limpo, uma por sensor:
//! - Média de N leituras consecutivas após o aquecedor estabilizar
//! - Tentativas instáveis (variância alta) são descartadas e repetidas
//! - Snapshot exportável/importável
//!
//! ### AirQualityClassifier
//!
//! - Razão sobre a baseline → GOOD / MODERATE / POOR / ALERT
//! - Histerese: sobe imediatamente, desce após N amostras consecutivas
//! - Nível agregado (pior dos sensores conhecidos)
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use voc_core::{AirQualityLevel, SensorId, ThresholdRatios};
//! use voc_olfactory::{AirQualityClassifier, CalibrationConfig, CalibrationOutcome, CalibrationTracker};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CalibrationConfig { sample_count: 3, ..CalibrationConfig::default() };
//! let mut tracker = CalibrationTracker::new(config, 1)?;
//! let mut classifier = AirQualityClassifier::new(vec![ThresholdRatios::default()], 3)?;
//! let sensor = SensorId(0);
//!
//! tracker.on_heater_steady(sensor)?;
//! let mut baseline = None;
//! for (t, raw) in [200u16, 201, 199].into_iter().enumerate() {
//!     let reading = tracker.compensate(sensor, raw, 1.0, t as u64);
//!     if let CalibrationOutcome::Completed(b) = tracker.observe(&reading)? {
//!         baseline = Some(b);
//!     }
//! }
//!
//! let baseline = baseline.expect("calibrated");
//! let reading = tracker.compensate(sensor, 460, 1.0, 10);
//! let result = classifier.classify(&reading, &baseline)?;
//! assert_eq!(result.level, AirQualityLevel::Alert);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod calibration;
pub mod classifier;

pub use error::{OlfactoryError, OlfactoryResult};
pub use calibration::{
    BaselineSnapshot, CalibrationConfig, CalibrationOutcome, CalibrationPhase, CalibrationTracker,
};
pub use classifier::{AirQualityClassifier, Classification, Hysteresis, LevelChange, classify, classify_ratio};
