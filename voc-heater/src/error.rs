//! Erros do controle do aquecedor

use thiserror::Error;
use voc_core::ChannelError;

pub type HeaterResult<T> = Result<T, HeaterError>;

/// Erros do aquecedor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaterError {
    /// Falha na linha de controle; aquecedor forçado a OFF até `reset`
    #[error("Heater fail-safe: {reason}")]
    FailSafe { reason: String },

    /// Operação recusada enquanto o fail-safe está travado
    #[error("Heater latched in fail-safe ({reason}); explicit reset required")]
    Latched { reason: String },

    /// Aquecedor não foi iniciado
    #[error("Heater not running")]
    NotRunning,

    #[error("Invalid heater configuration: {0}")]
    InvalidConfig(String),

    #[error("Heater line error: {0}")]
    Channel(#[from] ChannelError),
}

impl HeaterError {
    /// Erros que deixam o aquecedor desligado até intervenção do operador
    pub fn is_fatal(&self) -> bool {
        matches!(self, HeaterError::FailSafe { .. } | HeaterError::Latched { .. })
    }
}
