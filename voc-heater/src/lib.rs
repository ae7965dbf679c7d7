//! # 🔥 voc-heater - Aquecedor compartilhado dos sensores MQ
//!
//! Um único MOSFET alimenta os aquecedores dos dois sensores de gás: ambos
//! estão sempre aquecidos ou frios juntos, e não existe controle por sensor.
//!
//! ## Ciclo
//!
//! ```text
//! ┌────────┐  warmup_ms   ┌────────┐
//! │ WARMUP │─────────────▶│ STEADY │  duty_ratio × duty_period ligado
//! └────────┘              └────────┘
//!      ▲                       │ falha de escrita
//!      │ reset                 ▼
//!      └──────────────── ┌───────────┐
//!                        │ FAIL_SAFE │  desligado, travado
//!                        └───────────┘
//! ```
//!
//! O estado é publicado num snapshot atômico ([`HeaterHandle`]), lido sem
//! bloqueio pelo laço de amostragem para decidir se as leituras são confiáveis.
//!
//! ## Exemplo
//!
//! ```rust
//! use voc_core::{HardwareBus, HeaterMode, HeaterSwitch};
//! use voc_core::mock::MockTransport;
//! use voc_heater::{HeaterConfig, HeaterController};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = HardwareBus::new(MockTransport::new());
//! let line = HeaterSwitch::new(bus, Duration::from_millis(100));
//! let mut heater = HeaterController::new(line, HeaterConfig::default())?;
//! let handle = heater.handle();
//!
//! heater.start(0)?;
//! heater.tick(60_000)?;
//! assert_eq!(handle.current_mode(), HeaterMode::Steady);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod controller;

pub use error::{HeaterError, HeaterResult};
pub use controller::{HeaterConfig, HeaterController, HeaterHandle, ModeChange};
