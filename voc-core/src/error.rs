//! Erros do núcleo: transporte de hardware e configuração

use thiserror::Error;

/// Resultado de operações de configuração
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Falha transitória de um canal de hardware
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("I/O fault: {0}")]
    IoFault(String),
}

impl ChannelError {
    pub fn io(msg: impl Into<String>) -> Self {
        ChannelError::IoFault(msg.into())
    }
}

/// Erros de carga e validação da configuração
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },
}
