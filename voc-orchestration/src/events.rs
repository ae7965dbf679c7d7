//! Barramento de eventos do monitor
//!
//! Entrega cada [`MonitorEvent`] a handlers síncronos (callbacks) e a
//! assinaturas por canal crossbeam, e guarda um histórico limitado.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use crossbeam_utils::sync::ShardedLock;
use tracing::warn;
use voc_core::{ChannelId, EventKind, EventSink, MonitorEvent, SensorId};

use crate::error::OrchestrationResult;

/// Handler de eventos (callback)
pub type EventHandler = Arc<dyn Fn(&MonitorEvent) + Send + Sync>;

/// Filtro de eventos
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Todos os eventos
    All,
    /// Eventos de uma categoria
    Kind(EventKind),
    /// Eventos de um sensor de gás
    Sensor(SensorId),
    /// Falhas e recuperações de um canal
    Channel(ChannelId),
}

impl EventFilter {
    /// Verifica se um evento passa pelo filtro
    pub fn matches(&self, event: &MonitorEvent) -> bool {
        match (self, event) {
            (EventFilter::All, _) => true,
            (EventFilter::Kind(kind), event) => event.kind() == *kind,
            (EventFilter::Sensor(sensor), event) => event.sensor() == Some(*sensor),
            (EventFilter::Channel(channel), MonitorEvent::SensorFault { channel_id })
            | (EventFilter::Channel(channel), MonitorEvent::SensorRecovered { channel_id }) => {
                channel == channel_id
            }
            _ => false,
        }
    }
}

struct FilteredSender {
    filter: EventFilter,
    sender: Sender<MonitorEvent>,
}

/// Assinatura por canal
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<MonitorEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub fn try_recv(&self) -> Option<MonitorEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Aguarda um evento por até `timeout`
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<MonitorEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Esvazia os eventos pendentes
    pub fn drain(&self) -> Vec<MonitorEvent> {
        self.receiver.try_iter().collect()
    }

    /// Itera bloqueando até o barramento ser descartado
    pub fn iter(&self) -> impl Iterator<Item = MonitorEvent> + '_ {
        self.receiver.iter()
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// Bus de eventos
#[derive(Clone)]
pub struct EventBus {
    /// Handlers registrados por filtro
    handlers: Arc<Mutex<HashMap<EventFilter, Vec<EventHandler>>>>,
    /// Assinaturas por canal
    senders: Arc<ShardedLock<Vec<FilteredSender>>>,
    /// Histórico de eventos (limitado)
    history: Arc<Mutex<VecDeque<MonitorEvent>>>,
    /// Tamanho máximo do histórico
    max_history: usize,
}

impl EventBus {
    /// Cria novo bus de eventos
    pub fn new() -> Self {
        Self::with_history(256)
    }

    /// Cria com tamanho de histórico customizado
    pub fn with_history(max_history: usize) -> Self {
        Self {
            handlers: Arc::new(Mutex::new(HashMap::new())),
            senders: Arc::new(ShardedLock::new(Vec::new())),
            history: Arc::new(Mutex::new(VecDeque::new())),
            max_history,
        }
    }

    /// Registra handler para um filtro
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> OrchestrationResult<()>
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.lock()?;
        handlers.entry(filter).or_default().push(Arc::new(handler));
        Ok(())
    }

    /// Remove todos os handlers de um filtro
    pub fn unsubscribe(&self, filter: &EventFilter) -> OrchestrationResult<()> {
        let mut handlers = self.handlers.lock()?;
        handlers.remove(filter);
        Ok(())
    }

    /// Assina eventos por canal (sem limite de capacidade)
    pub fn subscribe_channel(&self, filter: EventFilter) -> OrchestrationResult<Subscription> {
        let (sender, receiver) = unbounded();
        self.senders.write()?.push(FilteredSender {
            filter: filter.clone(),
            sender,
        });
        Ok(Subscription { receiver, filter })
    }

    /// Emite um evento
    pub fn emit(&self, event: MonitorEvent) -> OrchestrationResult<()> {
        {
            let mut history = self.history.lock()?;
            history.push_back(event.clone());
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        {
            let mut senders = self.senders.write()?;
            // Assinaturas descartadas saem da lista
            senders.retain(|fs| !fs.filter.matches(&event) || fs.sender.send(event.clone()).is_ok());
        }

        // Clona a lista para não segurar o lock durante os callbacks
        let matching: Vec<EventHandler> = {
            let handlers = self.handlers.lock()?;
            handlers
                .iter()
                .filter(|(filter, _)| filter.matches(&event))
                .flat_map(|(_, list)| list.iter().cloned())
                .collect()
        };
        for handler in matching {
            handler(&event);
        }
        Ok(())
    }

    /// Retorna histórico de eventos
    pub fn history(&self) -> OrchestrationResult<Vec<MonitorEvent>> {
        let history = self.history.lock()?;
        Ok(history.iter().cloned().collect())
    }

    /// Limpa histórico
    pub fn clear_history(&self) -> OrchestrationResult<()> {
        self.history.lock()?.clear();
        Ok(())
    }

    /// Conta handlers registrados
    pub fn handler_count(&self) -> OrchestrationResult<usize> {
        let handlers = self.handlers.lock()?;
        Ok(handlers.values().map(|v| v.len()).sum())
    }

    /// Conta assinaturas por canal ativas
    pub fn subscriber_count(&self) -> OrchestrationResult<usize> {
        Ok(self.senders.read()?.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: MonitorEvent) {
        if let Err(e) = EventBus::emit(self, event) {
            warn!(error = %e, "event dropped");
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("max_history", &self.max_history)
            .field("history_len", &self.history.lock().map(|h| h.len()).unwrap_or(0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voc_core::AirQualityLevel;

    fn fault(index: u8) -> MonitorEvent {
        MonitorEvent::SensorFault {
            channel_id: ChannelId::Analog(index),
        }
    }

    fn classified(sensor: u8) -> MonitorEvent {
        MonitorEvent::SampleClassified {
            sensor_id: SensorId(sensor),
            level: AirQualityLevel::Good,
            compensated_value: 200.0,
            timestamp: 0,
        }
    }

    #[test]
    fn test_emit_event() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        bus.subscribe(EventFilter::All, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        bus.emit(fault(0)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count().unwrap(), 1);
    }

    #[test]
    fn test_filters() {
        assert!(EventFilter::Kind(EventKind::Fault).matches(&fault(0)));
        assert!(!EventFilter::Kind(EventKind::Heater).matches(&fault(0)));
        assert!(EventFilter::Channel(ChannelId::Analog(1)).matches(&fault(1)));
        assert!(!EventFilter::Channel(ChannelId::Analog(1)).matches(&fault(0)));
        assert!(EventFilter::Sensor(SensorId(1)).matches(&classified(1)));
        assert!(!EventFilter::Sensor(SensorId(1)).matches(&fault(1)));
    }

    #[test]
    fn test_handler_can_reenter_bus() {
        let bus = EventBus::new();
        let inner = bus.clone();
        bus.subscribe(EventFilter::All, move |_| {
            let _ = inner.history();
        })
        .unwrap();
        bus.emit(fault(0)).unwrap();
    }

    #[test]
    fn test_channel_subscription() {
        let bus = EventBus::new();
        let faults = bus.subscribe_channel(EventFilter::Kind(EventKind::Fault)).unwrap();

        bus.emit(classified(0)).unwrap();
        bus.emit(fault(1)).unwrap();

        assert_eq!(faults.drain(), vec![fault(1)]);
        assert!(faults.try_recv().is_none());
    }

    #[test]
    fn test_dropped_subscription_is_removed() {
        let bus = EventBus::new();
        let sub = bus.subscribe_channel(EventFilter::All).unwrap();
        assert_eq!(bus.subscriber_count().unwrap(), 1);
        drop(sub);
        bus.emit(fault(0)).unwrap();
        assert_eq!(bus.subscriber_count().unwrap(), 0);
    }

    #[test]
    fn test_history_limit() {
        let bus = EventBus::with_history(2);
        for i in 0..5 {
            bus.emit(fault(i)).unwrap();
        }
        let history = bus.history().unwrap();
        assert_eq!(history, vec![fault(3), fault(4)]);

        bus.clear_history().unwrap();
        assert!(bus.history().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        bus.subscribe(EventFilter::All, |_| {}).unwrap();
        bus.unsubscribe(&EventFilter::All).unwrap();
        assert_eq!(bus.handler_count().unwrap(), 0);
    }
}
