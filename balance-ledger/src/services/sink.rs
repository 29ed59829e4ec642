//! Event sink contract and the in-process sinks.

use crate::models::{EventEnvelope, EventKind};
use crate::services::error::SinkError;
use async_trait::async_trait;
use std::sync::Mutex;

/// Append-only destination for ledger events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: &EventEnvelope) -> Result<(), SinkError>;
}

/// Sink that keeps every event in memory, in emission order.
#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<EventEnvelope>>,
    rejecting: Mutex<bool>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject (or stop rejecting) subsequent emits.
    pub fn set_rejecting(&self, rejecting: bool) {
        if let Ok(mut flag) = self.rejecting.lock() {
            *flag = rejecting;
        }
    }

    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn emit(&self, event: &EventEnvelope) -> Result<(), SinkError> {
        let rejecting = *self
            .rejecting
            .lock()
            .map_err(|e| SinkError::Rejected(format!("Sink mutex poisoned: {}", e)))?;
        if rejecting {
            return Err(SinkError::Rejected("memory sink is rejecting events".to_string()));
        }

        self.events
            .lock()
            .map_err(|e| SinkError::Rejected(format!("Sink mutex poisoned: {}", e)))?
            .push(event.clone());
        Ok(())
    }
}

/// Sink that writes each event as one structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: &EventEnvelope) -> Result<(), SinkError> {
        let payload = serde_json::to_string(&event.event)?;
        tracing::info!(
            target: "ledger_events",
            event_id = %event.event_id,
            kind = %event.kind(),
            emitted_utc = %event.emitted_utc,
            payload = %payload,
            "Ledger event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, LedgerEvent};
    use rust_decimal_macros::dec;

    fn deposit_event() -> EventEnvelope {
        EventEnvelope::new(LedgerEvent::Deposit {
            to_address: Address::new("alice", dec!(150), dec!(0)),
            deposit_amount: dec!(100),
        })
    }

    #[tokio::test]
    async fn memory_sink_keeps_order_and_can_reject() {
        let sink = MemoryEventSink::new();
        sink.emit(&deposit_event()).await.unwrap();

        sink.set_rejecting(true);
        assert!(matches!(
            sink.emit(&deposit_event()).await,
            Err(SinkError::Rejected(_))
        ));

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.count_of(EventKind::Deposit), 1);
    }

    #[tokio::test]
    async fn tracing_sink_accepts_events() {
        assert!(TracingEventSink.emit(&deposit_event()).await.is_ok());
    }
}
