//! # 🧪 voc-core - Núcleo de aquisição de sensores MQ
//!
//! Tipos, capacidades de hardware e configuração compartilhados pelas camadas
//! do monitor de qualidade do ar.
//!
//! ## Topologia
//!
//! ```text
//! ┌──────────────┐  SPI   ┌─────────┐  ch0  ┌────────┐
//! │              │───────▶│ MCP3008 │◀──────│ MQ #1  │
//! │   Host       │        │ (10bit) │◀──────│ MQ #2  │
//! │              │  GPIO  └─────────┘  ch1  └────────┘
//! │              │───────▶ MOSFET ──────▶ aquecedores (compartilhado)
//! │              │  1-wire
//! │              │◀────── DHT11 (umidade + temperatura)
//! └──────────────┘
//! ```
//!
//! O ADC e a linha do aquecedor compartilham um único lock ([`bus::HardwareBus`]).
//! Os transportes físicos são injetados via [`traits::Transport`] e
//! [`traits::ClimateProbe`]; [`mock`] traz implementações roteirizáveis e
//! simuladas.
//!
//! ## Módulos
//!
//! - [`types`] - Amostras, níveis, estado do aquecedor
//! - [`traits`] - Capacidades de hardware
//! - [`bus`] - Barramento compartilhado e adaptadores de canal
//! - [`clock`] - Relógios monotônicos
//! - [`events`] - Eventos emitidos e destino de eventos
//! - [`config`] - Configuração (TOML + overrides `VOC_*`)
//! - [`error`] - Erros de canal e configuração

pub mod types;
pub mod error;
pub mod traits;
pub mod bus;
pub mod clock;
pub mod events;
pub mod config;
pub mod mock;
pub mod prelude;

pub use error::{ChannelError, ConfigError, ConfigResult};
pub use types::*;
pub use traits::{ClimateProbe, HardwareChannel, HeaterLine, Transport};
pub use bus::{AdcChannel, ClimateChannel, HardwareBus, HeaterSwitch};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{EventKind, EventSink, MonitorEvent, RecordingSink};
pub use config::{DriftPoint, DriftTableConfig, GasSensorConfig, MonitorConfig, ThresholdRatios};
