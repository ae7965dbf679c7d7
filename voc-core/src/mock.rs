//! Hardware mock e simulado
//!
//! - [`MockTransport`] / [`MockClimateProbe`]: roteirizáveis, para testes
//! - [`SimulatedTransport`] / [`SimulatedClimateProbe`]: ruído plausível de ar
//!   limpo, para rodar o daemon sem hardware real

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ChannelError;
use crate::traits::{ClimateProbe, Transport};
use crate::types::{ADC_CHANNELS, ADC_MAX, ClimateReading};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK ROTEIRIZÁVEL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct MockTransportState {
    /// Respostas enfileiradas por canal (consumidas antes do valor padrão)
    scripted: HashMap<u8, VecDeque<Result<u16, ChannelError>>>,
    defaults: HashMap<u8, u16>,
    reads: HashMap<u8, u32>,
    /// Escritas aplicadas na linha
    writes: Vec<bool>,
    write_attempts: u32,
    fail_writes: bool,
}

/// Transporte roteirizável. Clones compartilham o mesmo estado.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valor retornado quando não há resposta enfileirada
    pub fn set_default(&self, index: u8, raw: u16) {
        lock(&self.state).defaults.insert(index, raw);
    }

    /// Enfileira uma resposta para o canal
    pub fn push_adc(&self, index: u8, result: Result<u16, ChannelError>) {
        lock(&self.state)
            .scripted
            .entry(index)
            .or_default()
            .push_back(result);
    }

    /// Faz as próximas escritas no aquecedor falharem (ou voltarem a funcionar)
    pub fn fail_heater_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    pub fn adc_reads(&self, index: u8) -> u32 {
        lock(&self.state).reads.get(&index).copied().unwrap_or(0)
    }

    /// Escritas aplicadas na linha, em ordem
    pub fn heater_writes(&self) -> Vec<bool> {
        lock(&self.state).writes.clone()
    }

    /// Tentativas de escrita, incluindo as que falharam
    pub fn heater_write_attempts(&self) -> u32 {
        lock(&self.state).write_attempts
    }

    /// Último valor aplicado na linha
    pub fn heater_line(&self) -> Option<bool> {
        lock(&self.state).writes.last().copied()
    }
}

impl Transport for MockTransport {
    fn adc_read(&mut self, index: u8, _timeout: Duration) -> Result<u16, ChannelError> {
        let mut state = lock(&self.state);
        *state.reads.entry(index).or_insert(0) += 1;
        if let Some(result) = state.scripted.get_mut(&index).and_then(|q| q.pop_front()) {
            return result;
        }
        Ok(state.defaults.get(&index).copied().unwrap_or(0))
    }

    fn heater_write(&mut self, energized: bool, _timeout: Duration) -> Result<(), ChannelError> {
        let mut state = lock(&self.state);
        state.write_attempts += 1;
        if state.fail_writes {
            return Err(ChannelError::io("heater GPIO write failed"));
        }
        state.writes.push(energized);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MockProbeState {
    scripted: VecDeque<Result<ClimateReading, ChannelError>>,
    default: Option<ClimateReading>,
    reads: u32,
}

/// Sensor de clima roteirizável. Sem roteiro nem padrão, falha com timeout.
#[derive(Debug, Clone, Default)]
pub struct MockClimateProbe {
    state: Arc<Mutex<MockProbeState>>,
}

impl MockClimateProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(humidity_percent: f32, temperature_celsius: f32) -> Self {
        let probe = Self::new();
        probe.set_default(Some(ClimateReading {
            humidity_percent,
            temperature_celsius,
        }));
        probe
    }

    pub fn set_default(&self, reading: Option<ClimateReading>) {
        lock(&self.state).default = reading;
    }

    pub fn push(&self, result: Result<ClimateReading, ChannelError>) {
        lock(&self.state).scripted.push_back(result);
    }

    pub fn reads(&self) -> u32 {
        lock(&self.state).reads
    }
}

impl ClimateProbe for MockClimateProbe {
    fn measure(&mut self, timeout: Duration) -> Result<ClimateReading, ChannelError> {
        let mut state = lock(&self.state);
        state.reads += 1;
        if let Some(result) = state.scripted.pop_front() {
            return result;
        }
        state
            .default
            .ok_or(ChannelError::Timeout(timeout.as_millis() as u64))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULAÇÃO
// ═══════════════════════════════════════════════════════════════════════════════

/// Transporte simulado: sensores MQ em ar limpo com ruído e picos raros
#[derive(Debug)]
pub struct SimulatedTransport {
    rng: StdRng,
    clean_air: [u16; ADC_CHANNELS as usize],
    heater_on: bool,
    spike_probability: f64,
}

impl SimulatedTransport {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut clean_air = [0u16; ADC_CHANNELS as usize];
        for value in clean_air.iter_mut() {
            *value = rng.gen_range(180..=240);
        }
        Self {
            rng,
            clean_air,
            heater_on: false,
            spike_probability: 0.01,
        }
    }

    pub fn with_spike_probability(mut self, probability: f64) -> Self {
        self.spike_probability = probability.clamp(0.0, 1.0);
        self
    }
}

impl Transport for SimulatedTransport {
    fn adc_read(&mut self, index: u8, _timeout: Duration) -> Result<u16, ChannelError> {
        let base = *self
            .clean_air
            .get(index as usize)
            .ok_or_else(|| ChannelError::io(format!("no ADC channel {index}")))?;

        if !self.heater_on {
            // Sensor frio: resistência alta, tensão baixa
            return Ok(base / 4);
        }
        let noise: i32 = self.rng.gen_range(-3..=3);
        let mut value = base as i32 + noise;
        if self.rng.gen_bool(self.spike_probability) {
            value += self.rng.gen_range(80..400);
        }
        Ok(value.clamp(0, ADC_MAX as i32) as u16)
    }

    fn heater_write(&mut self, energized: bool, _timeout: Duration) -> Result<(), ChannelError> {
        self.heater_on = energized;
        Ok(())
    }
}

/// DHT11 simulado, com falhas transitórias ocasionais
#[derive(Debug)]
pub struct SimulatedClimateProbe {
    rng: StdRng,
    failure_probability: f64,
}

impl SimulatedClimateProbe {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed ^ 0x5EED),
            failure_probability: 0.05,
        }
    }
}

impl ClimateProbe for SimulatedClimateProbe {
    fn measure(&mut self, timeout: Duration) -> Result<ClimateReading, ChannelError> {
        if self.rng.gen_bool(self.failure_probability) {
            return Err(ChannelError::Timeout(timeout.as_millis() as u64));
        }
        Ok(ClimateReading {
            humidity_percent: self.rng.gen_range(45.0..65.0),
            temperature_celsius: self.rng.gen_range(20.0..28.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(100);

    #[test]
    fn test_mock_transport_script_then_default() {
        let mut transport = MockTransport::new();
        transport.set_default(1, 300);
        transport.push_adc(1, Err(ChannelError::Timeout(100)));

        assert!(transport.adc_read(1, T).is_err());
        assert_eq!(transport.adc_read(1, T).unwrap(), 300);
        assert_eq!(transport.adc_reads(1), 2);
    }

    #[test]
    fn test_mock_transport_write_failures_are_counted() {
        let mut transport = MockTransport::new();
        transport.heater_write(true, T).unwrap();
        transport.fail_heater_writes(true);
        assert!(transport.heater_write(false, T).is_err());
        assert_eq!(transport.heater_writes(), vec![true]);
        assert_eq!(transport.heater_write_attempts(), 2);
    }

    #[test]
    fn test_mock_probe_without_default_times_out() {
        let mut probe = MockClimateProbe::new();
        assert_eq!(probe.measure(T), Err(ChannelError::Timeout(100)));
    }

    #[test]
    fn test_simulated_transport_is_seeded() {
        let mut a = SimulatedTransport::new(7).with_spike_probability(0.0);
        let mut b = SimulatedTransport::new(7).with_spike_probability(0.0);
        a.heater_write(true, T).unwrap();
        b.heater_write(true, T).unwrap();
        for _ in 0..10 {
            assert_eq!(a.adc_read(0, T).unwrap(), b.adc_read(0, T).unwrap());
        }
    }

    #[test]
    fn test_simulated_transport_reads_low_when_cold() {
        let mut transport = SimulatedTransport::new(1).with_spike_probability(0.0);
        let cold = transport.adc_read(0, T).unwrap();
        transport.heater_write(true, T).unwrap();
        let hot = transport.adc_read(0, T).unwrap();
        assert!(hot > cold);
    }
}
