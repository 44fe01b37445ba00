//! High-level lease broker that wraps the two handshakes and the session
//! map behind a single ergonomic API.

use futures::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::events::EventHub;
use crate::identity::{IdentityVerifier, Sha256IdentityVerifier};
use crate::pricing;
use crate::session::Session;
use crate::settlement::{InMemorySettler, PaymentSettler};
use crate::types::{
    AcquireOptions, BrokerConfig, BrokerEvent, CoreAvailability, EventKind, PricingTier,
    ResourceKind,
};

/// Marketplace capacity snapshot: (kind, available, total).
const AVAILABILITY: [(ResourceKind, u32, u32); 2] = [
    (ResourceKind::Cpu, 8432, 12847),
    (ResourceKind::Gpu, 1523, 2891),
];

/// The main entry point for leasing cores. Verifies identity, creates and
/// tracks sessions, settles usage on release, and emits lifecycle events
/// to per-instance subscribers.
pub struct LeaseBroker {
    config: BrokerConfig,
    verifier: Box<dyn IdentityVerifier>,
    settler: Arc<dyn PaymentSettler>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    events: Arc<EventHub>,
}

impl LeaseBroker {
    /// Create a broker with the default keyed-hash verifier and in-memory
    /// settler derived from the configuration.
    pub fn new(config: BrokerConfig) -> Self {
        let verifier = Box::new(Sha256IdentityVerifier::new(config.identity_key.clone()));
        let settler = Arc::new(InMemorySettler::new(config.wallet_address.clone()));
        Self::with_backends(config, verifier, settler)
    }

    /// Create a broker with substituted verification/settlement backends.
    pub fn with_backends(
        config: BrokerConfig,
        verifier: Box<dyn IdentityVerifier>,
        settler: Arc<dyn PaymentSettler>,
    ) -> Self {
        Self {
            config,
            verifier,
            settler,
            sessions: Mutex::new(HashMap::new()),
            events: Arc::new(EventHub::new()),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// The settlement backend shared with every session this broker creates.
    pub fn settler(&self) -> Arc<dyn PaymentSettler> {
        Arc::clone(&self.settler)
    }

    /// Register a subscriber for one lifecycle event kind. Delivery is
    /// synchronous and ordered with respect to the emitting call.
    pub fn on<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&BrokerEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, callback);
    }

    /// Lease cores: run the 403 handshake, create and initialize a session,
    /// and start tracking it. Subscribers to `session.start` run before
    /// this returns.
    pub async fn acquire(&self, options: AcquireOptions) -> Result<Arc<Session>, Error> {
        if options.cores == 0 {
            return Err(Error::InvalidOptions {
                reason: "cores must be at least 1".to_string(),
            });
        }
        if options.resource == ResourceKind::Cpu && options.memory_gb.is_some() {
            return Err(Error::InvalidOptions {
                reason: "memory_gb applies to gpu leases only".to_string(),
            });
        }

        let available = self
            .get_available_cores()
            .iter()
            .find(|a| a.resource == options.resource)
            .map(|a| a.available)
            .unwrap_or(0);
        if options.cores > available {
            return Err(Error::InsufficientCores {
                resource: options.resource,
                requested: options.cores,
                available,
            });
        }

        let proof = self.verifier.generate_proof().await?;
        if !self.verifier.verify(&proof) {
            return Err(Error::IdentityVerificationFailed {
                reason: "generated proof failed verification".to_string(),
            });
        }

        let session = Arc::new(Session::new(
            options,
            self.config.clone(),
            proof,
            Arc::clone(&self.settler),
            Arc::clone(&self.events),
        ));
        session.initialize().await?;

        {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.insert(session.id().to_string(), Arc::clone(&session));
        }

        tracing::info!(
            session_id = %session.id(),
            resource = %session.options().resource,
            cores = session.options().cores,
            tier = %session.options().tier,
            "Session acquired"
        );

        self.events.emit(
            EventKind::SessionStart,
            json!({
                "session_id": session.id(),
                "resource": session.options().resource,
                "cores": session.options().cores,
                "tier": session.options().tier,
            }),
        );

        Ok(session)
    }

    /// Read-only marketplace snapshot of core availability.
    pub fn get_available_cores(&self) -> Vec<CoreAvailability> {
        AVAILABILITY
            .iter()
            .map(|&(resource, available, total)| CoreAvailability {
                resource,
                available,
                total,
                tier: "all".to_string(),
            })
            .collect()
    }

    /// The published pricing table.
    pub fn get_pricing(&self) -> Vec<PricingTier> {
        pricing::pricing_tiers()
    }

    /// Number of sessions currently tracked.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// A tracked session by id.
    pub fn get_session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
    }

    /// Release one session and stop tracking it. The session is
    /// deregistered whether or not its settlement succeeds.
    pub async fn release(&self, session_id: &str) -> Result<Option<String>, Error> {
        let session = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.remove(session_id)
        }
        .ok_or_else(|| Error::UnknownSession {
            session_id: session_id.to_string(),
        })?;

        session.release().await
    }

    /// Release every tracked session concurrently, then clear the tracked
    /// set. One session's settlement failure never prevents the others from
    /// releasing; failures are aggregated after all releases complete.
    pub async fn close(&self) -> Result<(), Error> {
        let sessions: Vec<Arc<Session>> = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.values().cloned().collect()
        };
        let attempted = sessions.len();

        let results = join_all(sessions.iter().map(|s| s.release())).await;

        let failures: Vec<String> = sessions
            .iter()
            .zip(results)
            .filter_map(|(session, result)| {
                result
                    .err()
                    .map(|e| format!("{}: {}", session.id(), e))
            })
            .collect();

        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        if failures.is_empty() {
            tracing::info!(released = attempted, "Broker closed");
            Ok(())
        } else {
            tracing::warn!(
                released = attempted,
                failed = failures.len(),
                "Broker closed with settlement failures"
            );
            Err(Error::CloseAggregate {
                attempted,
                failures,
            })
        }
    }
}
