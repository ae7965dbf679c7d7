//! # 🎭 voc-orchestration - Laço de amostragem e runtime do monitor
//!
//! Liga aquecedor, compensação ambiental, calibração e classificação num
//! laço periódico, e publica o resultado como [`MonitorEvent`]s.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Monitor                              │
//! │  ┌──────────────────┐         ┌──────────────────────────┐  │
//! │  │ thread heater    │ handle  │ thread sampling          │  │
//! │  │ HeaterController │────────▶│ SamplingEngine           │  │
//! │  └──────────────────┘         │  env → drift → gas → agg │  │
//! │                               └────────────┬─────────────┘  │
//! │                                            ▼                │
//! │                                  EventSink (EventBus)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```rust
//! use std::sync::Arc;
//! use voc_core::mock::{MockClimateProbe, MockTransport};
//! use voc_core::{AirQualityLevel, Clock, ManualClock, MonitorConfig, SensorId};
//! use voc_orchestration::{EventBus, Monitor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MockTransport::new();
//! let clock = ManualClock::new(0);
//! let bus = EventBus::new();
//! let monitor = Monitor::new(
//!     MonitorConfig::default(),
//!     transport,
//!     MockClimateProbe::with_default(50.0, 22.0),
//!     Arc::new(clock.clone()),
//!     Arc::new(bus.clone()),
//! )?;
//!
//! monitor.power_on()?;
//! monitor.step(clock.now())?;
//! // Aquecedor ainda em WARMUP: nada é classificado
//! assert_eq!(monitor.aggregate()?.level, AirQualityLevel::Unknown);
//! assert_eq!(monitor.aggregate()?.unknown, vec![SensorId(0), SensorId(1)]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod scheduler;
pub mod engine;
pub mod monitor;

pub use error::{OrchestrationError, OrchestrationResult};
pub use events::{EventBus, EventFilter, EventHandler, Subscription};
pub use scheduler::{Scheduler, SchedulerMode, SchedulerStats, TickInfo};
pub use engine::{SamplingEngine, TickSummary};
pub use monitor::Monitor;

pub use voc_core::{EventKind, EventSink, MonitorEvent};
