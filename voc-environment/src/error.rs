//! Erros da camada ambiental

use thiserror::Error;
use voc_core::ConfigError;

pub type EnvironmentResult<T> = Result<T, EnvironmentError>;

/// Erros do módulo de ambiente
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvironmentError {
    /// Tabela de correção malformada
    #[error("Invalid drift table: {0}")]
    InvalidTable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// Erros de tabela aparecem ao validar a configuração
impl From<EnvironmentError> for ConfigError {
    fn from(err: EnvironmentError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EnvironmentError::InvalidTable("empty curve".into());
        assert_eq!(err.to_string(), "Invalid drift table: empty curve");
    }

    #[test]
    fn test_conversion_to_config_error() {
        let err: ConfigError = EnvironmentError::InvalidTable("x".into()).into();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("drift table")));
    }
}
