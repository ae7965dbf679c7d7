//! Testes integrados do voc-environment

use voc_core::{ClimateReading, DriftPoint, EnvironmentSample, MonitorConfig};

use crate::*;

fn reading(h: f32, t: f32, at: u64) -> EnvironmentSample {
    EnvironmentSample::from_reading(
        ClimateReading {
            humidity_percent: h,
            temperature_celsius: t,
        },
        at,
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// DADOS VELHOS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_failing_reads_for_15s_warn_once() {
    // Leitura a cada 10s, timeout de 12s
    let mut monitor = EnvironmentMonitor::new(DriftTable::default(), 12_000, 0);
    monitor.record(reading(85.0, 30.0, 0));
    assert!(monitor.drift_factor(0) < 1.0);

    let mut warnings = Vec::new();
    for now in (1_000..=15_000).step_by(1_000) {
        if now % 10_000 == 0 {
            monitor.record(EnvironmentSample::invalid(now));
        }
        if let Some(w) = monitor.check_stale(now) {
            warnings.push(w);
        }
    }

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].last_valid_at, Some(0));
    assert_eq!(warnings[0].detected_at, 13_000);
    assert_eq!(monitor.drift_factor(15_000), 1.0);
}

#[test]
fn test_new_stale_period_warns_again() {
    let mut monitor = EnvironmentMonitor::new(DriftTable::default(), 12_000, 0);
    monitor.record(reading(65.0, 20.0, 0));
    assert!(monitor.check_stale(13_000).is_some());
    assert!(monitor.check_stale(14_000).is_none());

    // Volta a ler, depois falha de novo
    monitor.record(reading(65.0, 20.0, 20_000));
    assert!(!monitor.is_stale(20_000));
    assert!(monitor.check_stale(25_000).is_none());
    assert!(monitor.check_stale(32_001).is_some());
}

#[test]
fn test_never_valid_goes_stale_from_start() {
    let mut monitor = EnvironmentMonitor::new(DriftTable::default(), 30_000, 5_000);
    assert!(monitor.check_stale(35_000).is_none());
    let warning = monitor.check_stale(35_001).unwrap();
    assert_eq!(warning.last_valid_at, None);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURAÇÃO
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_from_config_uses_table_and_timeout() {
    let mut config = MonitorConfig::default();
    config.env_stale_timeout_ms = 5_000;
    config.drift_correction_table.humidity = vec![DriftPoint::new(50.0, 1.0), DriftPoint::new(90.0, 0.8)];

    let mut monitor = EnvironmentMonitor::from_config(&config, 0).unwrap();
    monitor.record(reading(70.0, 20.0, 0));
    assert!((monitor.drift_factor(1_000) - 0.9).abs() < 1e-4);
    assert!(monitor.is_stale(5_001));
}

#[test]
fn test_from_config_rejects_bad_table() {
    let mut config = MonitorConfig::default();
    config.drift_correction_table.temperature = vec![DriftPoint::new(20.0, 1.0), DriftPoint::new(10.0, 1.1)];
    assert!(matches!(
        EnvironmentMonitor::from_config(&config, 0),
        Err(EnvironmentError::InvalidTable(_))
    ));
}

#[test]
fn test_drift_table_serde() {
    let table = DriftTable::default();
    let json = serde_json::to_string(&table).unwrap();
    let back: DriftTable = serde_json::from_str(&json).unwrap();
    assert_eq!(back, table);
}
