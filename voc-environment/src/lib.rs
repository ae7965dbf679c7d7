//! # 🌍 voc-environment - Compensação ambiental
//!
//! Mantém a última leitura válida do sensor de umidade/temperatura e converte
//! a condição ambiental no fator de drift aplicado às leituras dos sensores MQ.
//!
//! ## Regras
//!
//! - Leituras que falham viram amostras inválidas; vale a última válida
//! - Mais velha que `env_stale_timeout_ms`: fator 1.0 e um aviso por período
//! - Correção = curva de umidade × curva de temperatura ([`DriftTable`])
//!
//! ## Módulos
//!
//! - [`drift`] - Curvas de correção
//! - [`monitor`] - Última amostra válida e dados velhos
//! - [`error`] - Tratamento de erros

pub mod error;
pub mod drift;
pub mod monitor;

pub use error::{EnvironmentError, EnvironmentResult};
pub use drift::{DriftCurve, DriftTable};
pub use monitor::{EnvironmentMonitor, StaleWarning};

#[cfg(test)]
mod tests;
