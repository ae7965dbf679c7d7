//! # Traits - Capacidades de hardware injetadas
//!
//! O núcleo depende apenas destes contratos, nunca de um barramento concreto.
//!
//! | Trait | Papel |
//! |:------|:------|
//! | [`Transport`] | SPI do MCP3008 + GPIO do MOSFET (um único lock) |
//! | [`ClimateProbe`] | Sensor single-wire de umidade/temperatura |
//! | [`HardwareChannel`] | Um canal de leitura com timeout |
//! | [`HeaterLine`] | Linha digital única do aquecedor compartilhado |
//!
//! Os adaptadores em [`crate::bus`] ligam os transportes aos canais.

use std::fmt::Debug;
use std::time::Duration;

use crate::error::ChannelError;
use crate::types::{ChannelId, ClimateReading};

/// Um canal físico de entrada.
///
/// `read` nunca bloqueia além do timeout configurado do canal e não tem efeitos
/// colaterais além da transação física.
pub trait HardwareChannel: Send + Debug {
    /// Valor nativo do canal
    type Reading: Copy + Debug;

    fn channel_id(&self) -> ChannelId;

    fn read(&mut self) -> Result<Self::Reading, ChannelError>;
}

/// Linha digital que chaveia o MOSFET dos dois aquecedores
pub trait HeaterLine: Send + Debug {
    fn write(&mut self, energized: bool) -> Result<(), ChannelError>;
}

/// Transporte compartilhado: ADC multiplexado e linha do aquecedor.
///
/// Nunca é acessado concorrentemente; ver [`crate::bus::HardwareBus`].
pub trait Transport: Send + Debug {
    /// Lê um canal do ADC (0-7), valor de 10 bits
    fn adc_read(&mut self, index: u8, timeout: Duration) -> Result<u16, ChannelError>;

    /// Escreve a linha do aquecedor
    fn heater_write(&mut self, energized: bool, timeout: Duration) -> Result<(), ChannelError>;
}

/// Sensor digital de umidade/temperatura.
///
/// Retorna as duas grandezas ou falha por inteiro; leituras parciais não existem.
pub trait ClimateProbe: Send + Debug {
    fn measure(&mut self, timeout: Duration) -> Result<ClimateReading, ChannelError>;
}
