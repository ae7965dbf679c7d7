//! Scheduler periódico interrompível (taxa fixa ou delay fixo)
//!
//! A espera entre ticks acontece em `recv_timeout` sobre o canal de parada:
//! uma mensagem ou o descarte do `Sender` acorda o laço imediatamente.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};

/// Modo de execução do scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerMode {
    /// Taxa fixa - mantém intervalo constante entre inícios de tick
    FixedRate,
    /// Delay fixo - espera o período inteiro após cada execução
    FixedDelay,
}

/// Informação de um tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    pub tick_number: u64,
    /// Ticks pulados por atraso desde o anterior
    pub missed: u64,
}

/// Estatísticas do scheduler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub tick_count: u64,
    pub missed_ticks: u64,
    pub period: Duration,
    pub avg_execution_time: Duration,
    pub max_execution_time: Duration,
}

/// Scheduler de um laço periódico
#[derive(Debug)]
pub struct Scheduler {
    period: Duration,
    mode: SchedulerMode,
    next_tick: Option<Instant>,
    last_finished: Option<Instant>,
    tick_count: u64,
    missed_ticks: u64,
    total_execution_time: Duration,
    max_execution_time: Duration,
}

impl Scheduler {
    pub fn new(period: Duration, mode: SchedulerMode) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            mode,
            next_tick: None,
            last_finished: None,
            tick_count: 0,
            missed_ticks: 0,
            total_execution_time: Duration::ZERO,
            max_execution_time: Duration::ZERO,
        }
    }

    pub fn fixed_rate(period: Duration) -> Self {
        Self::new(period, SchedulerMode::FixedRate)
    }

    pub fn fixed_delay(period: Duration) -> Self {
        Self::new(period, SchedulerMode::FixedDelay)
    }

    pub fn mode(&self) -> SchedulerMode {
        self.mode
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Aguarda o próximo tick. Retorna `None` quando o laço deve parar.
    ///
    /// O primeiro tick é imediato.
    pub fn wait_for_next_tick(&mut self, stop: &Receiver<()>) -> Option<TickInfo> {
        let now = Instant::now();
        let target = match self.mode {
            SchedulerMode::FixedRate => self.next_tick.unwrap_or(now),
            SchedulerMode::FixedDelay => self.last_finished.map(|t| t + self.period).unwrap_or(now),
        };

        if target > now {
            match stop.recv_timeout(target - now) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        } else {
            match stop.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Disconnected) => return None,
            }
        }

        let started = Instant::now();
        let mut missed = 0;
        let mut next = target + self.period;
        // Atrasado: pula ticks em vez de disparar em rajada
        while next <= started {
            next += self.period;
            missed += 1;
        }
        self.next_tick = Some(next);
        self.missed_ticks += missed;
        self.tick_count += 1;

        Some(TickInfo {
            tick_number: self.tick_count,
            missed,
        })
    }

    /// Registra tempo de execução de um tick
    pub fn record_execution_time(&mut self, duration: Duration) {
        self.total_execution_time += duration;
        self.max_execution_time = self.max_execution_time.max(duration);
        self.last_finished = Some(Instant::now());
    }

    /// Retorna estatísticas do scheduler
    pub fn stats(&self) -> SchedulerStats {
        let avg_execution_time = if self.tick_count > 0 {
            self.total_execution_time / self.tick_count.min(u32::MAX as u64) as u32
        } else {
            Duration::ZERO
        };
        SchedulerStats {
            tick_count: self.tick_count,
            missed_ticks: self.missed_ticks,
            period: self.period,
            avg_execution_time,
            max_execution_time: self.max_execution_time,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn missed_ticks(&self) -> u64 {
        self.missed_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_first_tick_is_immediate() {
        let (_tx, rx) = bounded::<()>(1);
        let mut scheduler = Scheduler::fixed_rate(Duration::from_secs(60));
        let started = Instant::now();
        let tick = scheduler.wait_for_next_tick(&rx).unwrap();
        assert_eq!(tick.tick_number, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stop_wakes_waiting_scheduler() {
        let (tx, rx) = bounded::<()>(1);
        let mut scheduler = Scheduler::fixed_rate(Duration::from_secs(60));
        scheduler.wait_for_next_tick(&rx).unwrap();

        let started = Instant::now();
        drop(tx);
        assert!(scheduler.wait_for_next_tick(&rx).is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_fixed_rate_period() {
        let (_tx, rx) = bounded::<()>(1);
        let mut scheduler = Scheduler::fixed_rate(Duration::from_millis(20));
        let started = Instant::now();
        for _ in 0..3 {
            scheduler.wait_for_next_tick(&rx).unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(scheduler.tick_count(), 3);
    }

    #[test]
    fn test_fixed_delay_waits_full_period_after_execution() {
        let (_tx, rx) = bounded::<()>(1);
        let mut scheduler = Scheduler::fixed_delay(Duration::from_millis(20));
        assert_eq!(scheduler.mode(), SchedulerMode::FixedDelay);

        scheduler.wait_for_next_tick(&rx).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        scheduler.record_execution_time(Duration::from_millis(30));

        let finished = Instant::now();
        let tick = scheduler.wait_for_next_tick(&rx).unwrap();
        assert!(finished.elapsed() >= Duration::from_millis(15));
        assert_eq!(tick.tick_number, 2);
        assert_eq!(tick.missed, 0);
    }

    #[test]
    fn test_missed_ticks_are_counted() {
        let (_tx, rx) = bounded::<()>(1);
        let mut scheduler = Scheduler::fixed_rate(Duration::from_millis(5));
        scheduler.wait_for_next_tick(&rx).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        let tick = scheduler.wait_for_next_tick(&rx).unwrap();
        assert!(tick.missed >= 1);
        assert_eq!(scheduler.stats().missed_ticks, tick.missed);
    }
}
