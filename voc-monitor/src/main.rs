//! VOC Monitor - daemon de qualidade do ar
//!
//! Aquece os sensores MQ, calibra a baseline de ar limpo e publica os níveis
//! classificados no log. Sem drivers de hardware, roda sobre o transporte
//! simulado (semente configurável).
//!
//! ## Environment Variables
//! - `VOC_CONFIG`: arquivo TOML de configuração
//! - `VOC_BASELINE`: arquivo JSON de baselines (importado na partida, exportado na parada)
//! - `VOC_*`: overrides de campos da configuração (ver `MonitorConfig::apply_overrides`)
//! - `RUST_LOG`: filtro de log (default: `voc_monitor=info,voc_orchestration=info`)
//!
//! ## Sinais
//! - `SIGINT` / `SIGTERM`: desliga o aquecedor e encerra
//! - `SIGHUP`: reset do aquecedor após um fail-safe
//! - `SIGUSR1`: recalibração de todos os sensores

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voc_core::mock::{SimulatedClimateProbe, SimulatedTransport};
use voc_core::{ClimateProbe, MonitorConfig, MonitorEvent, MonotonicClock, Transport};
use voc_olfactory::BaselineSnapshot;
use voc_orchestration::{EventBus, EventFilter, Monitor, OrchestrationResult};

type SimulatedMonitor = Monitor<SimulatedTransport, SimulatedClimateProbe>;

/// Ação do operador recebida por sinal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorCommand {
    ResetHeater,
    Recalibrate,
}

#[derive(Parser)]
#[command(name = "voc-monitor")]
#[command(author = "Silvano Neto <dev@silvanoneto.com>")]
#[command(version = "2026.1.16")]
#[command(about = "Air quality monitor for MQ gas sensors", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", env = "VOC_CONFIG")]
    config: Option<PathBuf>,

    /// Baseline snapshot (JSON), imported on start and exported on shutdown
    #[arg(short, long, value_name = "FILE", env = "VOC_BASELINE")]
    baseline: Option<PathBuf>,

    /// Seed of the simulated hardware
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the effective configuration and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voc_monitor=info,voc_orchestration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let bus = EventBus::new();
    bus.subscribe(EventFilter::All, log_event)?;

    let mut monitor = Monitor::new(
        config,
        SimulatedTransport::new(args.seed),
        SimulatedClimateProbe::new(args.seed),
        Arc::new(MonotonicClock::new()),
        Arc::new(bus.clone()),
    )?;

    if let Some(path) = args.baseline.as_deref() {
        import_baseline(&monitor, path)?;
    }

    monitor.start()?;
    info!(seed = args.seed, "voc-monitor running on simulated hardware");

    serve(&monitor).await?;
    info!("shutdown requested");

    let stopped = monitor.shutdown();
    if let Some(path) = args.baseline.as_deref() {
        export_baseline(&monitor, path)?;
    }
    stopped?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let mut config = match path {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn import_baseline(monitor: &SimulatedMonitor, path: &Path) -> Result<()> {
    if !path.exists() {
        info!(path = %path.display(), "no baseline snapshot, calibrating from scratch");
        return Ok(());
    }
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: BaselineSnapshot =
        serde_json::from_str(&source).with_context(|| format!("parsing {}", path.display()))?;
    let imported = monitor.import_baseline(&snapshot)?;
    info!(path = %path.display(), sensors = imported, "baseline imported");
    Ok(())
}

fn export_baseline(monitor: &SimulatedMonitor, path: &Path) -> Result<()> {
    let snapshot = monitor.export_baseline()?;
    if snapshot.baselines.is_empty() {
        debug!("no baseline to export");
        return Ok(());
    }
    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), sensors = snapshot.baselines.len(), "baseline exported");
    Ok(())
}

fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::SampleClassified {
            sensor_id,
            level,
            compensated_value,
            ..
        } => debug!(sensor = %sensor_id, %level, value = compensated_value, "sample"),
        MonitorEvent::LevelChanged {
            sensor_id, from, to, ..
        } => info!(sensor = %sensor_id, %from, %to, "level changed"),
        MonitorEvent::AggregateChanged { level, unknown, .. } => {
            info!(%level, unknown = ?unknown, "air quality")
        }
        MonitorEvent::SensorFault { channel_id } => warn!(channel = %channel_id, "sensor fault"),
        MonitorEvent::SensorRecovered { channel_id } => {
            info!(channel = %channel_id, "sensor recovered")
        }
        MonitorEvent::CalibrationUnstable {
            sensor_id,
            attempt,
            variance,
        } => warn!(sensor = %sensor_id, attempt, variance, "calibration unstable"),
        MonitorEvent::CalibrationExhausted { sensor_id, attempts } => error!(
            sensor = %sensor_id,
            attempts,
            "calibration exhausted, operator recalibration required"
        ),
        MonitorEvent::CalibrationCompleted {
            sensor_id,
            baseline_value,
            sample_count,
        } => info!(
            sensor = %sensor_id,
            baseline = baseline_value,
            samples = sample_count,
            "baseline set"
        ),
        MonitorEvent::EnvironmentStale { last_valid_at, .. } => {
            warn!(last_valid_at = ?last_valid_at, "environment data stale")
        }
        MonitorEvent::HeaterModeChanged { from, to, .. } => info!(%from, %to, "heater"),
        MonitorEvent::HeaterFailSafe { reason } => error!(%reason, "heater fail-safe, reset required"),
    }
}

fn apply_command<T, P>(monitor: &Monitor<T, P>, command: OperatorCommand) -> OrchestrationResult<()>
where
    T: Transport + 'static,
    P: ClimateProbe + 'static,
{
    info!(?command, "operator command");
    match command {
        OperatorCommand::ResetHeater => monitor.reset_heater(),
        OperatorCommand::Recalibrate => monitor.request_recalibration(),
    }
}

/// Atende comandos do operador até o pedido de parada
#[cfg(unix)]
async fn serve(monitor: &SimulatedMonitor) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("listening for SIGHUP")?;
    let mut user1 = signal(SignalKind::user_defined1()).context("listening for SIGUSR1")?;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let command = tokio::select! {
            _ = &mut shutdown => return Ok(()),
            _ = hangup.recv() => OperatorCommand::ResetHeater,
            _ = user1.recv() => OperatorCommand::Recalibrate,
        };
        if let Err(e) = apply_command(monitor, command) {
            warn!(?command, error = %e, "operator command failed");
        }
    }
}

#[cfg(not(unix))]
async fn serve(_monitor: &SimulatedMonitor) -> Result<()> {
    shutdown_signal().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voc_core::mock::{MockClimateProbe, MockTransport};
    use voc_core::{HeaterMode, ManualClock, RecordingSink};

    #[test]
    fn test_operator_commands_recover_from_fail_safe() {
        let transport = MockTransport::new();
        let monitor = Monitor::new(
            MonitorConfig::default(),
            transport.clone(),
            MockClimateProbe::with_default(50.0, 22.0),
            Arc::new(ManualClock::new(0)),
            Arc::new(RecordingSink::new()),
        )
        .unwrap();
        let handle = monitor.heater_handle();

        transport.fail_heater_writes(true);
        assert!(monitor.power_on().is_err());
        assert_eq!(handle.current_mode(), HeaterMode::FailSafe);
        assert!(apply_command(&monitor, OperatorCommand::Recalibrate).is_err());

        transport.fail_heater_writes(false);
        apply_command(&monitor, OperatorCommand::ResetHeater).unwrap();
        assert_eq!(handle.current_mode(), HeaterMode::Warmup);
        assert_eq!(transport.heater_line(), Some(true));

        apply_command(&monitor, OperatorCommand::Recalibrate).unwrap();
        assert_eq!(handle.current_mode(), HeaterMode::Warmup);
    }
}
