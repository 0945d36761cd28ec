use crate::event::event_bus::{CorrelationId, EventEnvelope, EventId};
use domain::event::DomainEvent;

/// 请求级上下文，串联同一请求触发的事件
#[derive(Debug, Clone)]
pub struct AppContext {
    pub event_id: EventId,
    pub correlation_id: CorrelationId,
    pub causation_id: EventId,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext {
    pub fn new() -> Self {
        let event_id = EventId::new();
        Self {
            event_id: event_id.clone(),
            correlation_id: CorrelationId::new(),
            causation_id: event_id,
        }
    }

    pub fn inherit(&self) -> Self {
        Self {
            event_id: EventId::new(),
            correlation_id: self.correlation_id.clone(),
            causation_id: self.event_id.clone(),
        }
    }

    /// 以当前上下文为因果包装领域事件
    pub fn envelope<E: DomainEvent>(&self, event: E) -> EventEnvelope<E> {
        EventEnvelope::new(
            event.aggregate_id(),
            event.version(),
            event,
            self.correlation_id.clone(),
            self.event_id.clone(),
        )
    }
}

impl<T> From<&EventEnvelope<T>> for AppContext {
    fn from(envelope: &EventEnvelope<T>) -> Self {
        Self {
            event_id: envelope.id.clone(),
            correlation_id: envelope.correlation_id.clone(),
            causation_id: envelope.causation_id.clone(),
        }
    }
}
