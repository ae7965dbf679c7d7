//! Erros específicos do módulo olfativo

use thiserror::Error;
use voc_core::{ConfigError, SensorId};

pub type OlfactoryResult<T> = Result<T, OlfactoryError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OlfactoryError {
    #[error("Unknown sensor: {0}")]
    UnknownSensor(SensorId),

    #[error("Invalid baseline for {sensor}: {reason}")]
    InvalidBaseline { sensor: SensorId, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ConfigError> for OlfactoryError {
    fn from(err: ConfigError) -> Self {
        OlfactoryError::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            OlfactoryError::UnknownSensor(SensorId(4)).to_string(),
            "Unknown sensor: gas4"
        );
        let err = OlfactoryError::InvalidBaseline {
            sensor: SensorId(0),
            reason: "not positive".into(),
        };
        assert!(err.to_string().contains("gas0"));
    }
}
