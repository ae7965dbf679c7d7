//! # Prelude - Re-exportações Convenientes
//!
//! ```
//! use voc_core::prelude::*;
//! ```

// Tipos
pub use crate::types::{
    AggregateLevel,
    AirQualityLevel,
    ChannelId,
    ClimateReading,
    CompensatedReading,
    EnvironmentSample,
    HeaterMode,
    HeaterState,
    RawSample,
    SensorBaseline,
    SensorId,
    Timestamp,
};

// Capacidades de hardware
pub use crate::traits::{ClimateProbe, HardwareChannel, HeaterLine, Transport};
pub use crate::bus::{AdcChannel, ClimateChannel, HardwareBus, HeaterSwitch};

// Tempo
pub use crate::clock::{Clock, ManualClock, MonotonicClock};

// Eventos
pub use crate::events::{EventKind, EventSink, MonitorEvent};

// Configuração e erros
pub use crate::config::{GasSensorConfig, MonitorConfig, ThresholdRatios};
pub use crate::error::{ChannelError, ConfigError};
