//! State-transition notifications.
//!
//! The ledger emits while holding its lock, so a sink observes events in the same total
//! order the operations were applied in. Failed operations emit nothing.

use crate::provider::RequestId;
use crate::types::TargetKind;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    CitizenRegistered {
        id: u64,
    },
    PolicyProposed {
        id: u64,
    },
    SimulationCompleted {
        policy_id: u64,
    },
    DecryptionRequested {
        kind: TargetKind,
        id: u64,
        request_id: RequestId,
    },
    DecryptionCompleted {
        kind: TargetKind,
        id: u64,
        request_id: RequestId,
    },
    /// A pending request outlived the configured reveal TTL and was dropped.
    DecryptionExpired {
        kind: TargetKind,
        id: u64,
        request_id: RequestId,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::CitizenRegistered { .. } => "citizen_registered",
            LedgerEvent::PolicyProposed { .. } => "policy_proposed",
            LedgerEvent::SimulationCompleted { .. } => "simulation_completed",
            LedgerEvent::DecryptionRequested { .. } => "decryption_requested",
            LedgerEvent::DecryptionCompleted { .. } => "decryption_completed",
            LedgerEvent::DecryptionExpired { .. } => "decryption_expired",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LedgerEvent);
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LedgerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, event: LedgerEvent) {
        (**self).emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = LedgerEvent::SimulationCompleted { policy_id: 3 };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "simulation_completed");
        assert_eq!(json["policy_id"], 3);
        assert_eq!(ev.name(), "simulation_completed");

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, ev);
    }
}
