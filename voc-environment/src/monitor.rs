//! Última amostra ambiental válida e detecção de dados velhos

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use voc_core::{EnvironmentSample, MonitorConfig, Timestamp};

use crate::drift::DriftTable;
use crate::error::{EnvironmentError, EnvironmentResult};

/// Aviso emitido uma vez ao entrar num período de dados velhos
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaleWarning {
    /// Instante da última amostra válida, se alguma existiu
    pub last_valid_at: Option<Timestamp>,
    pub detected_at: Timestamp,
}

/// Acompanha as amostras do DHT11 e fornece o fator de drift corrente
#[derive(Debug, Clone)]
pub struct EnvironmentMonitor {
    table: DriftTable,
    stale_timeout_ms: u64,
    /// Referência de idade enquanto nenhuma amostra válida chegou
    started_at: Timestamp,
    last_valid: Option<EnvironmentSample>,
    last_sample: Option<EnvironmentSample>,
    /// Já avisado neste período de dados velhos
    stale_reported: bool,
}

impl EnvironmentMonitor {
    pub fn new(table: DriftTable, stale_timeout_ms: u64, started_at: Timestamp) -> Self {
        Self {
            table,
            stale_timeout_ms,
            started_at,
            last_valid: None,
            last_sample: None,
            stale_reported: false,
        }
    }

    pub fn from_config(config: &MonitorConfig, started_at: Timestamp) -> EnvironmentResult<Self> {
        if config.env_stale_timeout_ms == 0 {
            return Err(EnvironmentError::InvalidConfig(
                "env_stale_timeout_ms must be > 0".into(),
            ));
        }
        let table = DriftTable::from_config(&config.drift_correction_table)?;
        Ok(Self::new(table, config.env_stale_timeout_ms, started_at))
    }

    /// Registra uma amostra. Amostras válidas encerram o período de dados velhos.
    pub fn record(&mut self, sample: EnvironmentSample) {
        if sample.valid {
            if self.stale_reported {
                debug!(at = sample.timestamp, "environment data fresh again");
            }
            self.last_valid = Some(sample);
            self.stale_reported = false;
        }
        self.last_sample = Some(sample);
    }

    pub fn last_valid(&self) -> Option<&EnvironmentSample> {
        self.last_valid.as_ref()
    }

    /// Amostra mais recente, válida ou não
    pub fn last_sample(&self) -> Option<&EnvironmentSample> {
        self.last_sample.as_ref()
    }

    pub fn is_stale(&self, now: Timestamp) -> bool {
        let reference = self.last_valid.map(|s| s.timestamp).unwrap_or(self.started_at);
        now.saturating_sub(reference) > self.stale_timeout_ms
    }

    /// Retorna o aviso apenas na transição para dados velhos
    pub fn check_stale(&mut self, now: Timestamp) -> Option<StaleWarning> {
        if !self.is_stale(now) || self.stale_reported {
            return None;
        }
        self.stale_reported = true;
        let warning = StaleWarning {
            last_valid_at: self.last_valid.map(|s| s.timestamp),
            detected_at: now,
        };
        warn!(
            last_valid_at = ?warning.last_valid_at,
            timeout_ms = self.stale_timeout_ms,
            "environment data stale, drift compensation disabled"
        );
        Some(warning)
    }

    /// Fator de drift corrente; 1.0 sem amostra válida ou com dados velhos
    pub fn drift_factor(&self, now: Timestamp) -> f32 {
        match self.last_valid {
            Some(sample) if !self.is_stale(now) => {
                self.table.factor(sample.humidity_percent, sample.temperature_celsius)
            }
            _ => 1.0,
        }
    }

    pub fn table(&self) -> &DriftTable {
        &self.table
    }
}
