use serde::{Deserialize, Serialize};

/// A unit of work submitted to a leased session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Caller-chosen task name, used in logs and receipts
    pub name: String,
    /// Opaque task payload
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Pins the simulated run time. Without a hint the run time is drawn
    /// uniformly from 500..1500 ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hint_ms: Option<u64>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: serde_json::Value::Null,
            duration_hint_ms: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_duration_hint_ms(mut self, duration_hint_ms: u64) -> Self {
        self.duration_hint_ms = Some(duration_hint_ms);
        self
    }
}

/// Per-task outcome returned by `Session::execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub success: bool,
    /// Measured task run time
    pub duration_ms: u64,
    /// Cost accrued by this task alone
    pub cost: f64,
}

/// Derived, read-only snapshot of a session's accounting.
/// Recomputed on each query, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub cores_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<u32>,
    /// Milliseconds since `initialize`, 0 if never initialized
    pub time_elapsed_ms: u64,
    pub cost_accumulated: f64,
    /// Tasks completed per elapsed second
    pub throughput: f64,
}
