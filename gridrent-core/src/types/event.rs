use serde::{Deserialize, Serialize};

/// Lifecycle event kinds emitted by a broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "session.start")]
    SessionStart,
    #[serde(rename = "session.end")]
    SessionEnd,
    #[serde(rename = "payment.pending")]
    PaymentPending,
    #[serde(rename = "payment.settled")]
    PaymentSettled,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "error")]
    Error,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::SessionStart => write!(f, "session.start"),
            EventKind::SessionEnd => write!(f, "session.end"),
            EventKind::PaymentPending => write!(f, "payment.pending"),
            EventKind::PaymentSettled => write!(f, "payment.settled"),
            EventKind::PaymentFailed => write!(f, "payment.failed"),
            EventKind::Error => write!(f, "error"),
        }
    }
}

/// One lifecycle event as delivered to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerEvent {
    pub kind: EventKind,
    pub data: serde_json::Value,
    /// Emission instant, unix milliseconds
    pub timestamp: u64,
}
