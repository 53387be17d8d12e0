//! Fulfillment backends.
//!
//! The arbiter treats fulfillment as a capability-typed dependency: anything
//! implementing [`Fulfillment`] can finalize a purchase attempt. Production
//! composition uses [`SimulatedFulfillment`]; tests substitute
//! [`StubFulfillment`] or their own deterministic implementations.

use std::future::Future;
use std::time::Duration;

use dibs_types::{ActorId, FulfillmentError};

const DEFAULT_LATENCY: Duration = Duration::from_secs(2);
const DEFAULT_FAILURE_RATE: f64 = 0.1;

/// Asynchronous backend that finalizes or rejects one purchase attempt.
///
/// Each call is independent and must eventually resolve; the arbiter never
/// cancels an in-flight call and treats every failure as recoverable.
pub trait Fulfillment: Send + Sync {
    /// Attempt to complete the purchase for `actor`.
    fn complete(
        &self,
        actor: ActorId,
    ) -> impl Future<Output = Result<(), FulfillmentError>> + Send;
}

/// Simulated fulfillment: fixed latency, then success or a decline drawn
/// with a fixed probability.
///
/// Defaults match the modeled backend: 2 seconds of latency and a 10%
/// failure rate. Both knobs are builder-adjustable; the failure rate is
/// clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatedFulfillment {
    latency: Duration,
    failure_rate: f64,
}

impl Default for SimulatedFulfillment {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

impl SimulatedFulfillment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }
}

impl Fulfillment for SimulatedFulfillment {
    fn complete(
        &self,
        actor: ActorId,
    ) -> impl Future<Output = Result<(), FulfillmentError>> + Send {
        let latency = self.latency;
        let failure_rate = self.failure_rate;
        async move {
            tokio::time::sleep(latency).await;
            if rand::random::<f64>() < failure_rate {
                Err(FulfillmentError::Declined {
                    reason: format!("Error completing purchase for actor {actor}."),
                })
            } else {
                Ok(())
            }
        }
    }
}

/// Deterministic, zero-delay backend.
///
/// Resolves every call with the same preconfigured result, which makes the
/// arbiter's transitions reproducible in tests and demos.
#[derive(Debug, Clone)]
pub struct StubFulfillment {
    result: Result<(), FulfillmentError>,
}

impl StubFulfillment {
    /// A backend that completes every purchase.
    #[must_use]
    pub fn succeeding() -> Self {
        Self { result: Ok(()) }
    }

    /// A backend that declines every purchase with `reason`.
    #[must_use]
    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            result: Err(FulfillmentError::Declined {
                reason: reason.into(),
            }),
        }
    }

    /// A backend that fails every purchase without a structured reason.
    #[must_use]
    pub fn failing_without_reason() -> Self {
        Self {
            result: Err(FulfillmentError::Unknown),
        }
    }
}

impl Fulfillment for StubFulfillment {
    fn complete(
        &self,
        _actor: ActorId,
    ) -> impl Future<Output = Result<(), FulfillmentError>> + Send {
        let result = self.result.clone();
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::{Duration, Fulfillment, FulfillmentError, SimulatedFulfillment, StubFulfillment};
    use dibs_types::ActorId;

    #[tokio::test(start_paused = true)]
    async fn simulated_backend_succeeds_after_its_latency() {
        let backend = SimulatedFulfillment::new()
            .with_latency(Duration::from_secs(2))
            .with_failure_rate(0.0);

        let started = tokio::time::Instant::now();
        let result = backend.complete(ActorId::new(1)).await;

        assert_eq!(result, Ok(()));
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_backend_declines_with_the_modeled_reason() {
        let backend = SimulatedFulfillment::new()
            .with_latency(Duration::from_millis(10))
            .with_failure_rate(1.0);

        let result = backend.complete(ActorId::new(3)).await;

        assert_eq!(
            result,
            Err(FulfillmentError::Declined {
                reason: "Error completing purchase for actor 3.".to_string(),
            })
        );
    }

    #[test]
    fn failure_rate_is_clamped() {
        let backend = SimulatedFulfillment::new().with_failure_rate(3.5);
        assert!((backend.failure_rate - 1.0).abs() < f64::EPSILON);

        let backend = SimulatedFulfillment::new().with_failure_rate(-1.0);
        assert!(backend.failure_rate.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn stub_backends_resolve_immediately_with_their_result() {
        let actor = ActorId::new(9);

        assert_eq!(StubFulfillment::succeeding().complete(actor).await, Ok(()));
        assert_eq!(
            StubFulfillment::declining("card declined").complete(actor).await,
            Err(FulfillmentError::Declined {
                reason: "card declined".to_string(),
            })
        );
        assert_eq!(
            StubFulfillment::failing_without_reason().complete(actor).await,
            Err(FulfillmentError::Unknown)
        );
    }
}
