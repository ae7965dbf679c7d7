//! Tabela de correção de drift dos sensores MQ
//!
//! A resistência dos sensores MQ cai com umidade e temperatura altas. A
//! correção é o produto de duas curvas lineares por partes, uma por grandeza,
//! com fator 1.0 no ponto de referência (20°C / 65%RH por padrão). Fora da
//! faixa tabelada o fator é grampeado no ponto extremo.

use serde::{Deserialize, Serialize};
use voc_core::config::validate_drift_curve;
use voc_core::{DriftPoint, DriftTableConfig};

use crate::error::{EnvironmentError, EnvironmentResult};

/// Curva monotônica, linear por partes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftCurve {
    points: Vec<DriftPoint>,
}

impl DriftCurve {
    /// Valida e cria a curva.
    ///
    /// Exige ao menos um ponto, abscissas estritamente crescentes e fatores
    /// positivos formando uma sequência monotônica.
    pub fn new(points: Vec<DriftPoint>) -> EnvironmentResult<Self> {
        validate_drift_curve(&points).map_err(EnvironmentError::InvalidTable)?;
        Ok(Self { points })
    }

    /// Curva constante (sem correção)
    pub fn identity() -> Self {
        Self {
            points: vec![DriftPoint::new(0.0, 1.0)],
        }
    }

    pub fn points(&self) -> &[DriftPoint] {
        &self.points
    }

    /// Fator em `x`, interpolado e grampeado nas extremidades
    pub fn factor_at(&self, x: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 1.0,
        };
        if x <= first.at {
            return first.factor;
        }
        if x >= last.at {
            return last.factor;
        }
        for w in self.points.windows(2) {
            let (a, b) = (w[0], w[1]);
            if x <= b.at {
                let t = (x - a.at) / (b.at - a.at);
                return a.factor + t * (b.factor - a.factor);
            }
        }
        last.factor
    }
}

/// Umidade × temperatura
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftTable {
    humidity: DriftCurve,
    temperature: DriftCurve,
}

impl DriftTable {
    pub fn new(humidity: DriftCurve, temperature: DriftCurve) -> Self {
        Self {
            humidity,
            temperature,
        }
    }

    pub fn from_config(config: &DriftTableConfig) -> EnvironmentResult<Self> {
        Ok(Self {
            humidity: DriftCurve::new(config.humidity.clone())?,
            temperature: DriftCurve::new(config.temperature.clone())?,
        })
    }

    /// Sem correção ambiental
    pub fn identity() -> Self {
        Self::new(DriftCurve::identity(), DriftCurve::identity())
    }

    /// Fator de drift para a condição ambiental dada
    pub fn factor(&self, humidity_percent: f32, temperature_celsius: f32) -> f32 {
        self.humidity.factor_at(humidity_percent) * self.temperature.factor_at(temperature_celsius)
    }
}

impl Default for DriftTable {
    fn default() -> Self {
        let config = DriftTableConfig::default();
        // Pontos padrão são válidos por construção
        Self {
            humidity: DriftCurve {
                points: config.humidity,
            },
            temperature: DriftCurve {
                points: config.temperature,
            },
        }
    }
}
