//! # Runtime do monitor
//!
//! Duas threads sobre o mesmo barramento de hardware:
//!
//! ```text
//! ┌──────────────┐ heater_tick_ms  ┌──────────────────┐
//! │ voc-heater   │────────────────▶│ HeaterController │──┐
//! └──────────────┘                 └──────────────────┘  │ HeaterSwitch
//!                                          │ HeaterHandle│
//! ┌──────────────┐ tick_period_ms  ┌───────▼──────────┐  ▼
//! │ voc-sampling │────────────────▶│ SamplingEngine   │─▶ HardwareBus (ADC + GPIO)
//! └──────────────┘                 └──────────────────┘
//! ```
//!
//! `shutdown` acorda os dois laços pelo canal de parada, aguarda o término e
//! força o aquecedor a OFF, mesmo depois de um pânico em qualquer das threads.
//! Descartar um `Monitor` faz o mesmo.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, error, info, warn};
use voc_core::{
    AdcChannel, AggregateLevel, Clock, ClimateChannel, ClimateProbe, EventSink, HardwareBus,
    HeaterMode, HeaterSwitch, MonitorConfig, MonitorEvent, Timestamp, Transport,
};
use voc_heater::{HeaterConfig, HeaterController, HeaterError, HeaterHandle, ModeChange};
use voc_olfactory::BaselineSnapshot;

use crate::engine::{SamplingEngine, TickSummary};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::scheduler::Scheduler;

type Heater<T> = HeaterController<HeaterSwitch<T>>;
type Engine<T, P> = SamplingEngine<AdcChannel<T>, ClimateChannel<P>>;

/// Monitor completo: aquecedor + amostragem
pub struct Monitor<T, P>
where
    T: Transport + 'static,
    P: ClimateProbe + 'static,
{
    config: MonitorConfig,
    heater: Arc<Mutex<Heater<T>>>,
    engine: Arc<Mutex<Engine<T, P>>>,
    handle: HeaterHandle,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    stop: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
}

impl<T, P> Monitor<T, P>
where
    T: Transport + 'static,
    P: ClimateProbe + 'static,
{
    /// Monta aquecedor, canais e motor de amostragem sobre os transportes
    pub fn new(
        config: MonitorConfig,
        transport: T,
        probe: P,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> OrchestrationResult<Self> {
        config.validate()?;
        let timeout = config.channel_read_timeout();
        let bus = HardwareBus::new(transport);

        let heater = HeaterController::new(
            HeaterSwitch::new(bus.clone(), timeout),
            HeaterConfig::from_monitor(&config),
        )?;
        let handle = heater.handle();

        let gas = config
            .sensors
            .iter()
            .map(|sensor| AdcChannel::new(bus.clone(), sensor.adc_channel, timeout))
            .collect::<Result<Vec<_>, _>>()?;
        let env = ClimateChannel::new(probe, timeout);
        let engine = SamplingEngine::new(
            &config,
            gas,
            env,
            handle.clone(),
            Arc::clone(&sink),
            clock.now(),
        )?;

        Ok(Self {
            config,
            heater: Arc::new(Mutex::new(heater)),
            engine: Arc::new(Mutex::new(engine)),
            handle,
            clock,
            sink,
            stop: None,
            threads: Vec::new(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn heater_handle(&self) -> HeaterHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_some()
    }

    /// Liga o aquecedor (WARMUP) sem iniciar as threads
    pub fn power_on(&self) -> OrchestrationResult<()> {
        let now = self.clock.now();
        let mut heater = self.heater.lock()?;
        let from = heater.mode();
        let result = heater.start(now);
        report_heater(self.sink.as_ref(), result.map(Some), from, now)
    }

    /// Liga o aquecedor e inicia as threads de aquecedor e amostragem
    pub fn start(&mut self) -> OrchestrationResult<()> {
        if self.is_running() {
            return Err(OrchestrationError::AlreadyRunning);
        }
        if let Err(e) = self.power_on() {
            // Fail-safe já emitido; a amostragem segue reportando UNKNOWN
            error!(error = %e, "heater failed to start");
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let heater_thread = {
            let heater = Arc::clone(&self.heater);
            let clock = Arc::clone(&self.clock);
            let sink = Arc::clone(&self.sink);
            let scheduler = Scheduler::fixed_rate(self.config.heater_tick());
            let stop = stop_rx.clone();
            thread::Builder::new()
                .name("voc-heater".into())
                .spawn(move || heater_loop(heater, clock, sink, scheduler, stop))
                .map_err(|e| OrchestrationError::ThreadSpawn(e.to_string()))?
        };
        self.threads.push(heater_thread);

        let sampling_thread = {
            let engine = Arc::clone(&self.engine);
            let clock = Arc::clone(&self.clock);
            let scheduler = Scheduler::fixed_rate(self.config.tick_period());
            thread::Builder::new()
                .name("voc-sampling".into())
                .spawn(move || sampling_loop(engine, clock, scheduler, stop_rx))
        };
        match sampling_thread {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                drop(stop_tx);
                self.join_threads();
                return Err(OrchestrationError::ThreadSpawn(e.to_string()));
            }
        }

        self.stop = Some(stop_tx);
        info!(
            sensors = self.config.sensors.len(),
            tick_ms = self.config.tick_period_ms,
            heater_tick_ms = self.config.heater_tick_ms,
            "monitor started"
        );
        Ok(())
    }

    /// Um ciclo síncrono do aquecedor (sem threads)
    pub fn heater_cycle(&self, now: Timestamp) -> OrchestrationResult<()> {
        heater_cycle(&self.heater, self.sink.as_ref(), now)
    }

    /// Um tick síncrono de amostragem (sem threads)
    pub fn sampling_cycle(&self, now: Timestamp) -> OrchestrationResult<TickSummary> {
        self.engine.lock()?.tick(now)
    }

    /// Aquecedor e amostragem no instante `now`
    pub fn step(&self, now: Timestamp) -> OrchestrationResult<TickSummary> {
        if let Err(e) = self.heater_cycle(now) {
            debug!(error = %e, "heater cycle failed");
        }
        self.sampling_cycle(now)
    }

    /// Reinicia o WARMUP e recalibra todos os sensores
    pub fn request_recalibration(&self) -> OrchestrationResult<()> {
        let now = self.clock.now();
        {
            let mut heater = self.heater.lock()?;
            let from = heater.mode();
            let result = heater.request_recalibration(now);
            report_heater(self.sink.as_ref(), result.map(Some), from, now)?;
        }
        self.engine.lock()?.request_recalibration();
        Ok(())
    }

    /// Sai do FAIL_SAFE (ação do operador)
    pub fn reset_heater(&self) -> OrchestrationResult<()> {
        let now = self.clock.now();
        let mut heater = self.heater.lock()?;
        let from = heater.mode();
        let result = heater.reset(now);
        report_heater(self.sink.as_ref(), result.map(Some), from, now)
    }

    pub fn aggregate(&self) -> OrchestrationResult<AggregateLevel> {
        Ok(self.engine.lock()?.aggregate().clone())
    }

    pub fn export_baseline(&self) -> OrchestrationResult<BaselineSnapshot> {
        Ok(self.engine.lock()?.export_baseline())
    }

    pub fn import_baseline(&self, snapshot: &BaselineSnapshot) -> OrchestrationResult<usize> {
        self.engine.lock()?.import_baseline(snapshot)
    }

    /// Para as threads e força o aquecedor a OFF
    pub fn shutdown(&mut self) -> OrchestrationResult<()> {
        let was_running = self.stop.take().is_some();
        let panicked = self.join_threads();

        let now = self.clock.now();
        // Um pânico com o lock do aquecedor não impede o OFF
        let mut heater = self.heater.lock().unwrap_or_else(|poisoned| {
            warn!("heater lock poisoned, forcing heater off anyway");
            poisoned.into_inner()
        });
        let from = heater.mode();
        let result = heater.shutdown();
        if from != HeaterMode::Off {
            self.sink.emit(MonitorEvent::HeaterModeChanged {
                from,
                to: HeaterMode::Off,
                timestamp: now,
            });
        }
        if was_running {
            info!("monitor stopped");
        }
        result?;
        match panicked {
            Some(name) => Err(OrchestrationError::ThreadPanicked(name)),
            None => Ok(()),
        }
    }

    /// Aguarda as threads; retorna o nome da primeira que terminou em pânico
    fn join_threads(&mut self) -> Option<String> {
        let mut panicked = None;
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!(thread = %name, "thread panicked");
                panicked.get_or_insert(name);
            }
        }
        panicked
    }
}

impl<T, P> Drop for Monitor<T, P>
where
    T: Transport + 'static,
    P: ClimateProbe + 'static,
{
    fn drop(&mut self) {
        if self.is_running() || self.handle.current_mode() != HeaterMode::Off {
            if let Err(e) = self.shutdown() {
                warn!(error = %e, "shutdown on drop failed");
            }
        }
    }
}

impl<T, P> std::fmt::Debug for Monitor<T, P>
where
    T: Transport + 'static,
    P: ClimateProbe + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("running", &self.is_running())
            .field("heater", &self.handle.snapshot())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LAÇOS
// ═══════════════════════════════════════════════════════════════════════════════

fn heater_cycle<T: Transport>(
    heater: &Mutex<Heater<T>>,
    sink: &dyn EventSink,
    now: Timestamp,
) -> OrchestrationResult<()> {
    let mut heater = heater.lock()?;
    let from = heater.mode();
    let result = heater.tick(now);
    report_heater(sink, result, from, now)
}

/// Converte o resultado de um comando do aquecedor em eventos
fn report_heater(
    sink: &dyn EventSink,
    result: Result<Option<ModeChange>, HeaterError>,
    from: HeaterMode,
    now: Timestamp,
) -> OrchestrationResult<()> {
    match result {
        Ok(Some(change)) => {
            info!(from = %change.from, to = %change.to, "heater mode changed");
            sink.emit(MonitorEvent::HeaterModeChanged {
                from: change.from,
                to: change.to,
                timestamp: change.at,
            });
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(HeaterError::FailSafe { reason }) => {
            sink.emit(MonitorEvent::HeaterFailSafe {
                reason: reason.clone(),
            });
            sink.emit(MonitorEvent::HeaterModeChanged {
                from,
                to: HeaterMode::FailSafe,
                timestamp: now,
            });
            Err(HeaterError::FailSafe { reason }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn heater_loop<T: Transport>(
    heater: Arc<Mutex<Heater<T>>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    mut scheduler: Scheduler,
    stop: Receiver<()>,
) {
    while scheduler.wait_for_next_tick(&stop).is_some() {
        let started = Instant::now();
        match heater_cycle(&heater, sink.as_ref(), clock.now()) {
            Ok(()) => {}
            Err(OrchestrationError::LockPoisoned(e)) => {
                error!(error = %e, "heater lock poisoned, stopping heater loop");
                break;
            }
            // Fail-safe travado: o laço segue sem escrever até o reset
            Err(e) => debug!(error = %e, "heater cycle"),
        }
        scheduler.record_execution_time(started.elapsed());
    }
    debug!(ticks = scheduler.tick_count(), "heater loop finished");
}

fn sampling_loop<T: Transport, P: ClimateProbe>(
    engine: Arc<Mutex<Engine<T, P>>>,
    clock: Arc<dyn Clock>,
    mut scheduler: Scheduler,
    stop: Receiver<()>,
) {
    while let Some(tick) = scheduler.wait_for_next_tick(&stop) {
        if tick.missed > 0 {
            warn!(missed = tick.missed, "sampling loop behind schedule");
        }
        let started = Instant::now();
        let result = match engine.lock() {
            Ok(mut engine) => engine.tick(clock.now()),
            Err(e) => {
                error!(error = %e, "engine lock poisoned, stopping sampling loop");
                break;
            }
        };
        if let Err(e) = result {
            error!(error = %e, "sampling tick failed");
        }
        scheduler.record_execution_time(started.elapsed());
    }
    debug!(ticks = scheduler.tick_count(), "sampling loop finished");
}
