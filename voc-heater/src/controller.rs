//! Máquina de estados do aquecedor compartilhado
//!
//! ```text
//!            start / request_recalibration
//!   OFF ───────────────────────────────▶ WARMUP ──(heater_warmup_s)──▶ STEADY
//!    ▲                                     ▲  │                          │
//!    │ shutdown                    reset   │  └────── falha de escrita ──┤
//!    │                                     │                             ▼
//!    └──────────────────────────────────── FAIL_SAFE ◀───────────────────┘
//! ```
//!
//! Em STEADY a linha segue o duty cycle (`duty_ratio` de cada período). Toda
//! falha de escrita força FAIL_SAFE com uma única tentativa de desenergizar;
//! nenhuma escrita acontece depois disso até `reset`.

use std::sync::Arc;

use crossbeam_utils::atomic::AtomicCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use voc_core::{HeaterLine, HeaterMode, HeaterState, MonitorConfig, Timestamp};

use crate::error::{HeaterError, HeaterResult};

/// Parâmetros do aquecedor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaterConfig {
    /// Duração do WARMUP contínuo (ms)
    pub warmup_ms: u64,
    /// Fração ligada em STEADY (0, 1]
    pub duty_ratio: f32,
    /// Período do duty cycle (ms)
    pub duty_period_ms: u64,
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            warmup_ms: 60_000,
            duty_ratio: 1.0,
            duty_period_ms: 10_000,
        }
    }
}

impl HeaterConfig {
    pub fn from_monitor(config: &MonitorConfig) -> Self {
        Self {
            warmup_ms: config.heater_warmup_ms(),
            duty_ratio: config.heater_duty_ratio,
            duty_period_ms: config.heater_duty_period_ms(),
        }
    }

    pub fn validate(&self) -> HeaterResult<()> {
        if !(self.duty_ratio > 0.0 && self.duty_ratio <= 1.0) {
            return Err(HeaterError::InvalidConfig(format!(
                "duty_ratio must be in (0, 1], got {}",
                self.duty_ratio
            )));
        }
        if self.duty_period_ms == 0 {
            return Err(HeaterError::InvalidConfig("duty_period_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Tempo ligado dentro de cada período de duty (ms)
    pub fn on_time_ms(&self) -> u64 {
        (self.duty_period_ms as f64 * self.duty_ratio as f64).round() as u64
    }
}

/// Transição de modo observada por um comando ou tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub from: HeaterMode,
    pub to: HeaterMode,
    pub at: Timestamp,
}

/// Leitura não bloqueante do estado do aquecedor.
///
/// Clones compartilham o mesmo snapshot; o estado nunca é visto pela metade.
#[derive(Debug, Clone)]
pub struct HeaterHandle {
    state: Arc<AtomicCell<HeaterState>>,
}

impl HeaterHandle {
    pub fn snapshot(&self) -> HeaterState {
        self.state.load()
    }

    pub fn current_mode(&self) -> HeaterMode {
        self.state.load().mode
    }

    pub fn is_energized(&self) -> bool {
        self.state.load().is_energized
    }

    /// Leituras de um sensor com aquecimento `warmup_ms` são confiáveis agora?
    pub fn trusts(&self, warmup_ms: u64, now: Timestamp) -> bool {
        self.state.load().trusts(warmup_ms, now)
    }
}

/// Controlador do MOSFET que alimenta os dois aquecedores
#[derive(Debug)]
pub struct HeaterController<L: HeaterLine> {
    line: L,
    config: HeaterConfig,
    state: HeaterState,
    shared: Arc<AtomicCell<HeaterState>>,
    /// Motivo do fail-safe, travado até `reset`
    latched: Option<String>,
}

impl<L: HeaterLine> HeaterController<L> {
    pub fn new(line: L, config: HeaterConfig) -> HeaterResult<Self> {
        config.validate()?;
        Ok(Self {
            line,
            config,
            state: HeaterState::OFF,
            shared: Arc::new(AtomicCell::new(HeaterState::OFF)),
            latched: None,
        })
    }

    pub fn handle(&self) -> HeaterHandle {
        HeaterHandle {
            state: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> HeaterState {
        self.state
    }

    pub fn mode(&self) -> HeaterMode {
        self.state.mode
    }

    pub fn config(&self) -> &HeaterConfig {
        &self.config
    }

    /// Motivo do fail-safe travado, se houver
    pub fn fail_reason(&self) -> Option<&str> {
        self.latched.as_deref()
    }

    /// Liga o aquecedor e entra em WARMUP
    pub fn start(&mut self, now: Timestamp) -> HeaterResult<ModeChange> {
        self.ensure_unlatched()?;
        info!(warmup_ms = self.config.warmup_ms, "heater start");
        self.enter_warmup(now)
    }

    /// Reinicia o WARMUP a pedido do operador
    pub fn request_recalibration(&mut self, now: Timestamp) -> HeaterResult<ModeChange> {
        self.ensure_unlatched()?;
        if self.state.mode == HeaterMode::Off {
            return Err(HeaterError::NotRunning);
        }
        info!(from = %self.state.mode, "heater recalibration requested");
        self.enter_warmup(now)
    }

    /// Única saída do FAIL_SAFE: limpa a trava e reentra em WARMUP
    pub fn reset(&mut self, now: Timestamp) -> HeaterResult<ModeChange> {
        if let Some(reason) = self.latched.take() {
            info!(%reason, "heater fail-safe reset by operator");
        }
        self.enter_warmup(now)
    }

    /// Avança a máquina de estados. Escreve na linha apenas quando o valor
    /// desejado muda.
    pub fn tick(&mut self, now: Timestamp) -> HeaterResult<Option<ModeChange>> {
        let mut change = None;
        match self.state.mode {
            HeaterMode::Off | HeaterMode::FailSafe => return Ok(None),
            HeaterMode::Warmup => {
                if now.saturating_sub(self.state.warmup_started_at) >= self.config.warmup_ms {
                    change = Some(self.transition(HeaterMode::Steady, now));
                    self.state.cycle_started_at = now;
                    debug!(at = now, "heater warm-up complete");
                } else {
                    self.drive(true)?;
                }
            }
            HeaterMode::Steady => {}
        }

        if self.state.mode == HeaterMode::Steady {
            let desired = self.duty_phase_on(now);
            self.drive(desired)?;
        }
        self.publish();
        Ok(change)
    }

    /// Força OFF independentemente do modo.
    ///
    /// Em FAIL_SAFE a linha não é tocada (a trava permanece até `reset`).
    pub fn shutdown(&mut self) -> HeaterResult<()> {
        let result = if self.latched.is_some() {
            Ok(())
        } else {
            self.line.write(false).map_err(HeaterError::from)
        };
        if let Err(e) = &result {
            warn!(error = %e, "heater de-energize on shutdown failed");
        }
        self.state.mode = HeaterMode::Off;
        self.state.is_energized = false;
        self.publish();
        info!("heater shut down");
        result
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNOS
    // ═══════════════════════════════════════════════════════════════════════════

    fn ensure_unlatched(&self) -> HeaterResult<()> {
        match &self.latched {
            Some(reason) => Err(HeaterError::Latched {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn enter_warmup(&mut self, now: Timestamp) -> HeaterResult<ModeChange> {
        let change = self.transition(HeaterMode::Warmup, now);
        self.state.warmup_started_at = now;
        self.state.cycle_started_at = now;
        self.state.is_energized = false;
        self.drive(true)?;
        self.publish();
        Ok(change)
    }

    fn transition(&mut self, to: HeaterMode, now: Timestamp) -> ModeChange {
        let change = ModeChange {
            from: self.state.mode,
            to,
            at: now,
        };
        self.state.mode = to;
        change
    }

    fn duty_phase_on(&self, now: Timestamp) -> bool {
        if self.config.duty_ratio >= 1.0 {
            return true;
        }
        let elapsed = now.saturating_sub(self.state.cycle_started_at) % self.config.duty_period_ms;
        elapsed < self.config.on_time_ms()
    }

    fn drive(&mut self, energized: bool) -> HeaterResult<()> {
        if self.state.is_energized == energized {
            return Ok(());
        }
        match self.line.write(energized) {
            Ok(()) => {
                self.state.is_energized = energized;
                Ok(())
            }
            Err(e) => Err(self.fail_safe(e.to_string())),
        }
    }

    fn fail_safe(&mut self, reason: String) -> HeaterError {
        error!(%reason, from = %self.state.mode, "heater line fault, forcing fail-safe");
        if let Err(e) = self.line.write(false) {
            warn!(error = %e, "best-effort heater de-energize failed");
        }
        self.state.mode = HeaterMode::FailSafe;
        self.state.is_energized = false;
        self.latched = Some(reason.clone());
        self.publish();
        HeaterError::FailSafe { reason }
    }

    fn publish(&self) {
        self.shared.store(self.state);
    }
}
