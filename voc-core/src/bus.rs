//! Barramento compartilhado e adaptadores de canal
//!
//! O ADC e a linha do aquecedor ficam atrás de um único mutex: no máximo uma
//! transação pendente, e nenhuma leitura analógica durante uma escrita no
//! aquecedor. A espera pelo lock é limitada pelo timeout da transação.

use std::sync::{Arc, Mutex, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::ChannelError;
use crate::traits::{ClimateProbe, HardwareChannel, HeaterLine, Transport};
use crate::types::{ADC_CHANNELS, ADC_MAX, ChannelId, ClimateReading};

const LOCK_POLL: Duration = Duration::from_micros(250);

/// Transporte compartilhado entre o laço do aquecedor e o de amostragem
#[derive(Debug)]
pub struct HardwareBus<T: Transport> {
    inner: Arc<Mutex<T>>,
}

impl<T: Transport> Clone for HardwareBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> HardwareBus<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Executa uma transação com tempo total limitado a `timeout`.
    ///
    /// O tempo gasto esperando o lock é descontado do tempo da transação; um
    /// resultado entregue após o prazo é descartado como `Timeout`.
    pub fn transaction<R>(
        &self,
        timeout: Duration,
        op: impl FnOnce(&mut T, Duration) -> Result<R, ChannelError>,
    ) -> Result<R, ChannelError> {
        let timeout_ms = timeout.as_millis() as u64;
        let deadline = Instant::now() + timeout;

        let mut guard = loop {
            match self.inner.try_lock() {
                Ok(guard) => break guard,
                // Transação anterior em pânico: o transporte segue utilizável,
                // e desenergizar o aquecedor depende dele
                Err(TryLockError::Poisoned(poisoned)) => {
                    warn!("hardware bus lock poisoned by a panicked transaction, recovering");
                    self.inner.clear_poison();
                    break poisoned.into_inner();
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(ChannelError::Timeout(timeout_ms));
                    }
                    thread::sleep(LOCK_POLL);
                }
            }
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ChannelError::Timeout(timeout_ms));
        }

        let value = op(&mut *guard, remaining)?;
        if Instant::now() > deadline {
            return Err(ChannelError::Timeout(timeout_ms));
        }
        Ok(value)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTADORES
// ═══════════════════════════════════════════════════════════════════════════════

/// Canal analógico do ADC
#[derive(Debug)]
pub struct AdcChannel<T: Transport> {
    bus: HardwareBus<T>,
    index: u8,
    timeout: Duration,
}

impl<T: Transport> AdcChannel<T> {
    pub fn new(bus: HardwareBus<T>, index: u8, timeout: Duration) -> Result<Self, ChannelError> {
        if index >= ADC_CHANNELS {
            return Err(ChannelError::io(format!(
                "ADC channel {index} out of range (0-{})",
                ADC_CHANNELS - 1
            )));
        }
        Ok(Self { bus, index, timeout })
    }

    pub fn index(&self) -> u8 {
        self.index
    }
}

impl<T: Transport> HardwareChannel for AdcChannel<T> {
    type Reading = u16;

    fn channel_id(&self) -> ChannelId {
        ChannelId::Analog(self.index)
    }

    fn read(&mut self) -> Result<u16, ChannelError> {
        let index = self.index;
        let raw = self
            .bus
            .transaction(self.timeout, |transport, remaining| transport.adc_read(index, remaining))?;
        if raw > ADC_MAX {
            return Err(ChannelError::io(format!("ADC value {raw} exceeds 10-bit range")));
        }
        Ok(raw)
    }
}

/// Chave do aquecedor (GPIO do MOSFET) sobre o barramento compartilhado
#[derive(Debug)]
pub struct HeaterSwitch<T: Transport> {
    bus: HardwareBus<T>,
    timeout: Duration,
}

impl<T: Transport> HeaterSwitch<T> {
    pub fn new(bus: HardwareBus<T>, timeout: Duration) -> Self {
        Self { bus, timeout }
    }
}

impl<T: Transport> HeaterLine for HeaterSwitch<T> {
    fn write(&mut self, energized: bool) -> Result<(), ChannelError> {
        self.bus
            .transaction(self.timeout, |transport, remaining| transport.heater_write(energized, remaining))
    }
}

/// Canal digital de umidade/temperatura
#[derive(Debug)]
pub struct ClimateChannel<P: ClimateProbe> {
    probe: P,
    timeout: Duration,
}

impl<P: ClimateProbe> ClimateChannel<P> {
    pub fn new(probe: P, timeout: Duration) -> Self {
        Self { probe, timeout }
    }
}

impl<P: ClimateProbe> HardwareChannel for ClimateChannel<P> {
    type Reading = ClimateReading;

    fn channel_id(&self) -> ChannelId {
        ChannelId::Environment
    }

    fn read(&mut self) -> Result<ClimateReading, ChannelError> {
        let started = Instant::now();
        let reading = self.probe.measure(self.timeout)?;
        if started.elapsed() > self.timeout {
            return Err(ChannelError::Timeout(self.timeout.as_millis() as u64));
        }
        if !reading.humidity_percent.is_finite() || !reading.temperature_celsius.is_finite() {
            return Err(ChannelError::io("non-finite climate reading"));
        }
        Ok(reading)
    }
}
