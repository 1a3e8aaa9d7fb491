//! Append-only audit trail
//!
//! The engine hands every lifecycle event to an [`AuditLog`]. Recording is
//! fire-and-forget: a log cannot reject an event or fail the call that
//! produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::events::ContractEvent;

/// Sink for contract events.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: ContractEvent);
}

impl<T: AuditLog + ?Sized> AuditLog for Arc<T> {
    fn record(&self, event: ContractEvent) {
        (**self).record(event)
    }
}

/// A recorded event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: ContractEvent,
}

/// In-memory audit log.
///
/// Sequence numbers start at 1 and keep increasing across `drain` calls.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    inner: Mutex<LogState>,
}

#[derive(Debug, Default)]
struct LogState {
    next_sequence: u64,
    records: Vec<AuditRecord>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all retained records.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.state().records.clone()
    }

    /// Snapshot of retained events, without record metadata.
    pub fn events(&self) -> Vec<ContractEvent> {
        self.state().records.iter().map(|r| r.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().records.is_empty()
    }

    /// Drain all records (consume and clear).
    pub fn drain(&self) -> Vec<AuditRecord> {
        std::mem::take(&mut self.state().records)
    }

    fn state(&self) -> MutexGuard<'_, LogState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, event: ContractEvent) {
        let mut state = self.state();
        state.next_sequence += 1;
        let record = AuditRecord {
            sequence: state.next_sequence,
            recorded_at: Utc::now(),
            event,
        };
        state.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Deposited;
    use rust_decimal::Decimal;
    use types::ids::AccountId;

    fn deposit_event(value: i64) -> ContractEvent {
        ContractEvent::Deposited(Deposited {
            account_id: AccountId::new(),
            value: Decimal::from(value),
            units: Decimal::from(value * 1000),
        })
    }

    #[test]
    fn test_records_are_sequenced() {
        let log = MemoryAuditLog::new();
        log.record(deposit_event(1));
        log.record(deposit_event(2));

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, 1);
        assert_eq!(records[1].sequence, 2);
        assert!(records[0].recorded_at <= records[1].recorded_at);
    }

    #[test]
    fn test_drain_keeps_sequence_running() {
        let log = MemoryAuditLog::new();
        log.record(deposit_event(1));

        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());

        log.record(deposit_event(2));
        assert_eq!(log.records()[0].sequence, 2);
    }

    #[test]
    fn test_events_strip_metadata() {
        let log = MemoryAuditLog::new();
        let event = deposit_event(3);
        log.record(event.clone());
        assert_eq!(log.events(), vec![event]);
    }
}
