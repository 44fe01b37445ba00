//! Per-broker observer hub for lifecycle events.
//!
//! Subscribers register by event kind and are invoked synchronously, in
//! registration order, before the emitting call returns. Each broker owns
//! its own hub; there is no process-wide bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{BrokerEvent, EventKind};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

type Callback = Arc<dyn Fn(&BrokerEvent) + Send + Sync>;

/// Observer registry scoped to one broker instance.
#[derive(Default)]
pub struct EventHub {
    subscribers: Mutex<HashMap<EventKind, Vec<Callback>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one event kind.
    pub fn on<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&BrokerEvent) + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.entry(kind).or_default().push(Arc::new(callback));
    }

    /// Stamp and deliver an event to every subscriber of its kind.
    ///
    /// The subscriber list is snapshotted before delivery so a callback may
    /// register further subscribers without deadlocking.
    pub fn emit(&self, kind: EventKind, data: serde_json::Value) {
        let event = BrokerEvent {
            kind,
            data,
            timestamp: now_ms(),
        };

        let callbacks: Vec<Callback> = {
            let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            subscribers.get(&kind).cloned().unwrap_or_default()
        };

        for callback in callbacks {
            callback(&event);
        }
    }

    /// Number of subscribers currently registered for one event kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.get(&kind).map(Vec::len).unwrap_or(0)
    }
}
