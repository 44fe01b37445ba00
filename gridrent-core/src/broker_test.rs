#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::broker::LeaseBroker;
    use crate::error::Error;
    use crate::identity::IdentityVerifier;
    use crate::settlement::{InMemorySettler, PaymentSettler, UnsignedTransfer};
    use crate::types::{
        AcquireOptions, BrokerConfig, EventKind, IdentityProof, ResourceKind, TaskSpec, Tier,
    };

    fn test_config() -> BrokerConfig {
        BrokerConfig::new("test-identity-key", "test-wallet-address")
    }

    fn gpu_performance() -> AcquireOptions {
        AcquireOptions::new(ResourceKind::Gpu, 4, Tier::Performance)
    }

    /// Settler whose first settle call fails; all later calls succeed.
    struct FirstCallFailsSettler {
        inner: InMemorySettler,
        calls: AtomicUsize,
    }

    impl FirstCallFailsSettler {
        fn new() -> Self {
            Self {
                inner: InMemorySettler::new("test-wallet"),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentSettler for FirstCallFailsSettler {
        async fn settle(
            &self,
            amount: f64,
            session_id: &str,
            duration_ms: u64,
        ) -> Result<String, Error> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(Error::PaymentFailed {
                    session_id: session_id.to_string(),
                    reason: "ledger unavailable".to_string(),
                });
            }
            self.inner.settle(amount, session_id, duration_ms).await
        }

        fn estimate_fee(&self, amount: f64) -> f64 {
            self.inner.estimate_fee(amount)
        }

        async fn get_balance(&self) -> f64 {
            self.inner.get_balance().await
        }

        async fn create_transaction(
            &self,
            from: &str,
            to: &str,
            amount_minor: u64,
        ) -> Result<UnsignedTransfer, Error> {
            self.inner.create_transaction(from, to, amount_minor).await
        }
    }

    /// Verifier that can never produce a proof.
    struct BrokenVerifier;

    #[async_trait]
    impl IdentityVerifier for BrokenVerifier {
        async fn generate_proof(&self) -> Result<IdentityProof, Error> {
            Err(Error::IdentityVerificationFailed {
                reason: "signing material unavailable".to_string(),
            })
        }

        fn verify(&self, _proof: &IdentityProof) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_acquire_creates_tracked_active_session() {
        let broker = LeaseBroker::new(test_config());
        let session = broker.acquire(gpu_performance()).await.unwrap();

        assert!(session.is_active());
        assert_eq!(broker.session_count(), 1);
        assert!(broker.get_session(session.id()).is_some());
    }

    #[tokio::test]
    async fn test_acquire_rejects_zero_cores() {
        let broker = LeaseBroker::new(test_config());
        let err = broker
            .acquire(AcquireOptions::new(ResourceKind::Gpu, 0, Tier::Standard))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[tokio::test]
    async fn test_acquire_rejects_memory_on_cpu_lease() {
        let broker = LeaseBroker::new(test_config());
        let err = broker
            .acquire(AcquireOptions::new(ResourceKind::Cpu, 8, Tier::Standard).with_memory_gb(16))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[tokio::test]
    async fn test_acquire_enforces_capacity() {
        let broker = LeaseBroker::new(test_config());
        let err = broker
            .acquire(AcquireOptions::new(ResourceKind::Gpu, 2000, Tier::Extreme))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientCores {
                resource: ResourceKind::Gpu,
                requested: 2000,
                available: 1523,
            }
        ));
    }

    #[tokio::test]
    async fn test_acquire_surfaces_identity_failure() {
        let broker = LeaseBroker::with_backends(
            test_config(),
            Box::new(BrokenVerifier),
            Arc::new(InMemorySettler::new("test-wallet")),
        );
        let err = broker.acquire(gpu_performance()).await.unwrap_err();
        assert!(matches!(err, Error::IdentityVerificationFailed { .. }));
        assert_eq!(broker.session_count(), 0);
    }

    #[tokio::test]
    async fn test_session_start_emitted_before_acquire_returns() {
        let broker = LeaseBroker::new(test_config());
        let seen = Arc::new(AtomicBool::new(false));

        let seen_clone = Arc::clone(&seen);
        broker.on(EventKind::SessionStart, move |event| {
            assert_eq!(event.kind, EventKind::SessionStart);
            assert!(event.data.get("session_id").is_some());
            seen_clone.store(true, Ordering::SeqCst);
        });

        broker.acquire(gpu_performance()).await.unwrap();
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_event_subscribers_are_per_broker_instance() {
        let broker_a = LeaseBroker::new(test_config());
        let broker_b = LeaseBroker::new(test_config());

        let seen = Arc::new(AtomicBool::new(false));
        let seen_clone = Arc::clone(&seen);
        broker_a.on(EventKind::SessionStart, move |_| {
            seen_clone.store(true, Ordering::SeqCst);
        });

        broker_b.acquire(gpu_performance()).await.unwrap();
        assert!(!seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_get_available_cores_snapshot() {
        let broker = LeaseBroker::new(test_config());
        let cores = broker.get_available_cores();

        assert_eq!(cores.len(), 2);
        assert_eq!(cores[0].resource, ResourceKind::Cpu);
        assert_eq!(cores[0].available, 8432);
        assert_eq!(cores[0].total, 12847);
        assert_eq!(cores[1].resource, ResourceKind::Gpu);
        assert_eq!(cores[1].available, 1523);
        assert_eq!(cores[1].total, 2891);
    }

    #[tokio::test]
    async fn test_get_pricing_has_three_tiers() {
        let broker = LeaseBroker::new(test_config());
        let pricing = broker.get_pricing();
        assert_eq!(pricing.len(), 3);
        assert_eq!(pricing[1].tier, Tier::Performance);
        assert_eq!(pricing[1].gpu_rate, 0.012);
    }

    #[tokio::test]
    async fn test_broker_release_deregisters_session() {
        let broker = LeaseBroker::new(test_config());
        let session = broker.acquire(gpu_performance()).await.unwrap();
        session
            .execute(&TaskSpec::new("task").with_duration_hint_ms(10))
            .await
            .unwrap();

        let tx = broker.release(session.id()).await.unwrap();
        assert!(tx.is_some());
        assert!(!session.is_active());
        assert_eq!(broker.session_count(), 0);

        let err = broker.release(session.id()).await.unwrap_err();
        assert!(matches!(err, Error::UnknownSession { .. }));
    }

    #[tokio::test]
    async fn test_close_releases_all_sessions() {
        let broker = LeaseBroker::new(test_config());
        let s1 = broker.acquire(gpu_performance()).await.unwrap();
        let s2 = broker
            .acquire(AcquireOptions::new(ResourceKind::Cpu, 8, Tier::Standard))
            .await
            .unwrap();
        let s3 = broker
            .acquire(AcquireOptions::new(ResourceKind::Gpu, 1, Tier::Extreme))
            .await
            .unwrap();
        assert_eq!(broker.session_count(), 3);

        broker.close().await.unwrap();

        assert!(!s1.is_active());
        assert!(!s2.is_active());
        assert!(!s3.is_active());
        assert_eq!(broker.session_count(), 0);
    }

    #[tokio::test]
    async fn test_close_isolates_settlement_failures() {
        // max_retries 1 so the poisoned first call burns one session's budget.
        let settler = Arc::new(FirstCallFailsSettler::new());
        let broker = LeaseBroker::with_backends(
            test_config().with_max_retries(1),
            Box::new(crate::identity::Sha256IdentityVerifier::new("test-identity-key")),
            Arc::clone(&settler) as Arc<dyn PaymentSettler>,
        );

        let s1 = broker.acquire(gpu_performance()).await.unwrap();
        let s2 = broker.acquire(gpu_performance()).await.unwrap();
        let s3 = broker.acquire(gpu_performance()).await.unwrap();

        let err = broker.close().await.unwrap_err();
        match err {
            Error::CloseAggregate {
                attempted,
                failures,
            } => {
                assert_eq!(attempted, 3);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected CloseAggregate, got {other:?}"),
        }

        // Every session released despite the one failed settlement.
        assert!(!s1.is_active());
        assert!(!s2.is_active());
        assert!(!s3.is_active());
        assert_eq!(broker.session_count(), 0);
        assert_eq!(settler.inner.settle_count(), 2);
    }

    #[tokio::test]
    async fn test_end_to_end_lease_lifecycle() {
        let broker = LeaseBroker::new(test_config());
        let order = Arc::new(Mutex::new(Vec::new()));

        for kind in [
            EventKind::SessionStart,
            EventKind::PaymentPending,
            EventKind::PaymentSettled,
            EventKind::SessionEnd,
        ] {
            let order_clone = Arc::clone(&order);
            broker.on(kind, move |event| {
                order_clone.lock().unwrap().push(event.kind.to_string());
            });
        }

        let session = broker.acquire(gpu_performance()).await.unwrap();
        session
            .execute(&TaskSpec::new("step-1").with_duration_hint_ms(10))
            .await
            .unwrap();
        session
            .execute(&TaskSpec::new("step-2").with_duration_hint_ms(10))
            .await
            .unwrap();

        let metrics = session.metrics();
        assert!(metrics.cost_accumulated > 0.0);

        let tx = session.release().await.unwrap();
        assert!(tx.is_some());

        let observed = order.lock().unwrap().clone();
        assert_eq!(
            observed,
            vec![
                "session.start",
                "payment.pending",
                "payment.settled",
                "session.end",
            ]
        );
    }
}
