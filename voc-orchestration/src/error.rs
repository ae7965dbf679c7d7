//! Erros de orquestração

use thiserror::Error;
use voc_core::{ChannelError, ConfigError};
use voc_environment::EnvironmentError;
use voc_heater::HeaterError;
use voc_olfactory::OlfactoryError;

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// Erros de orquestração
#[derive(Debug, Error, Clone)]
pub enum OrchestrationError {
    /// Configuração inválida
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Heater error: {0}")]
    Heater(#[from] HeaterError),

    #[error("Calibration error: {0}")]
    Olfactory(#[from] OlfactoryError),

    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Runtime já iniciado
    #[error("Monitor already running")]
    AlreadyRunning,

    /// Falha ao criar thread
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    /// Thread terminou em pânico
    #[error("Thread panicked: {0}")]
    ThreadPanicked(String),

    /// Lock poison
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<ConfigError> for OrchestrationError {
    fn from(err: ConfigError) -> Self {
        OrchestrationError::InvalidConfiguration(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for OrchestrationError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        OrchestrationError::LockPoisoned(err.to_string())
    }
}
