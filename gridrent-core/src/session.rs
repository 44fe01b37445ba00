//! One leased allocation of cores with its own accounting and lifecycle.
//!
//! A session moves `Created -> Active -> Released`. Cost accrues per
//! executed task while the session is active; releasing settles the total
//! through the 402 handshake exactly once.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, timeout};

use crate::error::Error;
use crate::events::EventHub;
use crate::pricing;
use crate::settlement::PaymentSettler;
use crate::types::{
    AcquireOptions, BrokerConfig, EventKind, ExecutionReceipt, IdentityProof, SessionMetrics,
    TaskSpec,
};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed but not yet initialized. Transient.
    Created,
    /// Initialized and accruing cost
    Active,
    /// Released; settlement has been attempted
    Released,
}

/// Mutable accounting guarded by the per-session lock.
struct SessionState {
    phase: SessionPhase,
    /// Unix ms of the last `initialize`, 0 before the first
    started_at_ms: u64,
    cost_accumulated: f64,
    tasks_completed: u64,
    /// Unix ms the lease runs to, when a duration was requested
    lease_deadline_ms: Option<u64>,
    /// Transaction id of the completed settlement
    settlement_tx: Option<String>,
}

/// One leased allocation of cores.
pub struct Session {
    id: String,
    options: AcquireOptions,
    config: BrokerConfig,
    identity: IdentityProof,
    settler: Arc<dyn PaymentSettler>,
    events: Arc<EventHub>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("config", &self.config)
            .field("identity", &self.identity)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Construct a session in the `Created` phase with a fresh 128-bit id.
    pub fn new(
        options: AcquireOptions,
        config: BrokerConfig,
        identity: IdentityProof,
        settler: Arc<dyn PaymentSettler>,
        events: Arc<EventHub>,
    ) -> Self {
        let mut id_bytes = [0u8; 16];
        OsRng.fill_bytes(&mut id_bytes);

        Self {
            id: hex::encode(id_bytes),
            options,
            config,
            identity,
            settler,
            events,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Created,
                started_at_ms: 0,
                cost_accumulated: 0.0,
                tasks_completed: 0,
                lease_deadline_ms: None,
                settlement_tx: None,
            }),
        }
    }

    /// Immutable session id, 32 hex characters.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &AcquireOptions {
        &self.options
    }

    /// The identity proof this session was acquired under.
    pub fn identity(&self) -> &IdentityProof {
        &self.identity
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).phase
    }

    pub fn is_active(&self) -> bool {
        self.phase() == SessionPhase::Active
    }

    /// Transaction id of the completed settlement, if any.
    pub fn settlement_tx(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .settlement_tx
            .clone()
    }

    /// Start the lease clock: `Created -> Active`.
    ///
    /// Calling this again while active resets the clock. A released session
    /// cannot be re-initialized.
    pub async fn initialize(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.phase == SessionPhase::Released {
            return Err(Error::SessionNotActive {
                session_id: self.id.clone(),
            });
        }

        let now = now_ms();
        state.phase = SessionPhase::Active;
        state.started_at_ms = now;
        state.lease_deadline_ms = self.options.duration_ms.map(|d| now + d);

        tracing::debug!(session_id = %self.id, "Session initialized");
        Ok(())
    }

    /// Run one task on the leased cores and accrue its cost.
    ///
    /// Valid only while active. The task runs under the configured
    /// `timeout_ms` deadline; a task that exceeds it fails with
    /// [`Error::TaskTimeout`] and accrues nothing.
    pub async fn execute(&self, task: &TaskSpec) -> Result<ExecutionReceipt, Error> {
        {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.phase != SessionPhase::Active {
                return Err(Error::SessionNotActive {
                    session_id: self.id.clone(),
                });
            }
        }

        let planned_ms = task
            .duration_hint_ms
            .unwrap_or_else(|| rand::thread_rng().gen_range(500..1500));

        let started = Instant::now();
        timeout(
            Duration::from_millis(self.config.timeout_ms),
            sleep(Duration::from_millis(planned_ms)),
        )
        .await
        .map_err(|_| Error::TaskTimeout {
            session_id: self.id.clone(),
            timeout_ms: self.config.timeout_ms,
        })?;

        let duration_ms = started.elapsed().as_millis() as u64;
        let rate =
            pricing::effective_rate(self.options.tier, self.options.resource, self.options.memory_gb);
        let cost = duration_ms as f64 / 1000.0 * rate;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // Cost may only accrue while the session is active; a release that
        // completed mid-task voids the receipt.
        if state.phase != SessionPhase::Active {
            return Err(Error::SessionNotActive {
                session_id: self.id.clone(),
            });
        }
        state.cost_accumulated += cost;
        state.tasks_completed += 1;

        tracing::debug!(
            session_id = %self.id,
            task = %task.name,
            duration_ms = duration_ms,
            cost = cost,
            "Task executed"
        );

        Ok(ExecutionReceipt {
            success: true,
            duration_ms,
            cost,
        })
    }

    /// End the lease and settle the accumulated cost: `Active -> Released`.
    ///
    /// The first call settles exactly once and returns `Some(tx_id)`; any
    /// later call is a no-op returning `None`. Settlement is retried up to
    /// the configured `max_retries`, each attempt bounded by `timeout_ms`.
    pub async fn release(&self) -> Result<Option<String>, Error> {
        let (amount, duration_ms) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match state.phase {
                SessionPhase::Active => {
                    state.phase = SessionPhase::Released;
                    (state.cost_accumulated, now_ms() - state.started_at_ms)
                }
                // Never activated or already released: nothing to settle.
                SessionPhase::Created | SessionPhase::Released => return Ok(None),
            }
        };

        self.events.emit(
            EventKind::PaymentPending,
            json!({ "session_id": self.id, "amount": amount }),
        );

        let attempts = self.config.max_retries.max(1);
        let mut last_failure = String::new();
        for attempt in 1..=attempts {
            match timeout(
                Duration::from_millis(self.config.timeout_ms),
                self.settler.settle(amount, &self.id, duration_ms),
            )
            .await
            {
                Ok(Ok(tx_id)) => {
                    {
                        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                        state.settlement_tx = Some(tx_id.clone());
                    }
                    self.events.emit(
                        EventKind::PaymentSettled,
                        json!({ "session_id": self.id, "amount": amount, "tx_id": tx_id }),
                    );
                    self.events.emit(
                        EventKind::SessionEnd,
                        json!({
                            "session_id": self.id,
                            "cost_accumulated": amount,
                            "tx_id": tx_id,
                        }),
                    );
                    tracing::info!(session_id = %self.id, tx_id = %tx_id, "Session released");
                    return Ok(Some(tx_id));
                }
                Ok(Err(e)) => {
                    last_failure = e.to_string();
                    tracing::warn!(
                        session_id = %self.id,
                        attempt = attempt,
                        error = %last_failure,
                        "Settlement attempt failed"
                    );
                }
                Err(_) => {
                    last_failure = format!("settlement timed out after {}ms", self.config.timeout_ms);
                    tracing::warn!(
                        session_id = %self.id,
                        attempt = attempt,
                        "Settlement attempt timed out"
                    );
                }
            }
        }

        self.events.emit(
            EventKind::PaymentFailed,
            json!({ "session_id": self.id, "amount": amount, "reason": last_failure }),
        );
        self.events.emit(
            EventKind::SessionEnd,
            json!({
                "session_id": self.id,
                "cost_accumulated": amount,
                "tx_id": serde_json::Value::Null,
            }),
        );
        Err(Error::PaymentFailed {
            session_id: self.id.clone(),
            reason: last_failure,
        })
    }

    /// Read-only accounting snapshot, valid in any phase.
    pub fn metrics(&self) -> SessionMetrics {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let time_elapsed_ms = if state.started_at_ms == 0 {
            0
        } else {
            now_ms().saturating_sub(state.started_at_ms)
        };
        let throughput = if time_elapsed_ms > 0 && state.tasks_completed > 0 {
            state.tasks_completed as f64 / (time_elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };

        SessionMetrics {
            cores_used: self.options.cores,
            memory_gb: self.options.memory_gb,
            time_elapsed_ms,
            cost_accumulated: state.cost_accumulated,
            throughput,
        }
    }

    /// Push the lease deadline out by `additional_ms`. Valid only while
    /// active. A session acquired without a requested duration gets a
    /// deadline measured from now.
    pub async fn extend_lease(&self, additional_ms: u64) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.phase != SessionPhase::Active {
            return Err(Error::SessionNotActive {
                session_id: self.id.clone(),
            });
        }

        state.lease_deadline_ms = Some(match state.lease_deadline_ms {
            Some(deadline) => deadline + additional_ms,
            None => now_ms() + additional_ms,
        });

        tracing::debug!(
            session_id = %self.id,
            additional_ms = additional_ms,
            "Lease extended"
        );
        Ok(())
    }

    /// Current lease deadline in unix ms, when one is set.
    pub fn lease_deadline_ms(&self) -> Option<u64> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .lease_deadline_ms
    }
}
