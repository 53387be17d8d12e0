//! The purchase arbitration state machine.
//!
//! [`PurchaseArbiter`] owns every piece of mutable purchase state: the
//! per-actor records, the completed-sale marker and the available-quantity
//! counter. All precondition checks and the transition into `processing`
//! happen under one lock acquisition, so no other attempt can observe or
//! mutate shared state between the check and the flag set. The lock is
//! never held across the fulfillment await and is re-acquired to apply the
//! result.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;

use dibs_types::{ActorId, ActorPurchaseState, Outcome};

use crate::fulfillment::Fulfillment;

/// Units on hand when an arbiter is built with [`PurchaseArbiter::new`].
pub const DEFAULT_STOCK: u32 = 1;

#[derive(Debug, Default)]
struct ArbiterState {
    /// Records for every actor that has ever reached the processing step.
    /// Never pruned for the lifetime of the arbiter.
    records: HashMap<ActorId, ActorPurchaseState>,
    /// The winning actor, once the sale has completed. Authoritative: every
    /// record and every lazily derived snapshot agrees with this field.
    sale: Option<ActorId>,
    /// Units still available. Drops to 0 exactly once, atomically with the
    /// sale, and never recovers.
    available: u32,
}

impl ArbiterState {
    /// Current state for `actor` without materializing a record.
    fn snapshot(&self, actor: ActorId) -> ActorPurchaseState {
        self.records
            .get(&actor)
            .copied()
            .unwrap_or(ActorPurchaseState {
                sold: self.sale.is_some(),
                buyer_id: self.sale,
                processing: false,
            })
    }

    fn any_processing(&self) -> bool {
        self.records.values().any(|record| record.processing)
    }

    /// Record for `actor`, created on first use with the lazily derived
    /// default (which reflects a completed sale, if any).
    fn record_mut(&mut self, actor: ActorId) -> &mut ActorPurchaseState {
        let sale = self.sale;
        self.records.entry(actor).or_insert(ActorPurchaseState {
            sold: sale.is_some(),
            buyer_id: sale,
            processing: false,
        })
    }

    /// Apply the sale to `buyer` as one transition: zero the counter, set
    /// the sale marker and converge every record.
    fn complete_sale(&mut self, buyer: ActorId) {
        self.available = 0;
        self.sale = Some(buyer);
        self.record_mut(buyer);
        for record in self.records.values_mut() {
            record.sold = true;
            record.buyer_id = Some(buyer);
            record.processing = false;
        }
    }
}

/// Arbitrates concurrent attempts to purchase a single-unit resource.
///
/// Exactly one actor can ever receive `Success`; everyone else is told the
/// item is already sold, that an attempt is in flight, or that the item is
/// out of stock. Clones are cheap and share the same state, so one arbiter
/// can be handed to any number of concurrent callers.
///
/// ```rust
/// use dibs_core::{PurchaseArbiter, StubFulfillment};
/// use dibs_types::ActorId;
///
/// # async fn demo() {
/// let arbiter = PurchaseArbiter::new(StubFulfillment::succeeding());
/// let outcome = arbiter.attempt_purchase(ActorId::new(1)).await;
/// assert!(outcome.is_success());
/// # }
/// ```
#[derive(Debug)]
pub struct PurchaseArbiter<F> {
    state: Arc<Mutex<ArbiterState>>,
    fulfillment: Arc<F>,
}

impl<F> Clone for PurchaseArbiter<F> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            fulfillment: Arc::clone(&self.fulfillment),
        }
    }
}

impl<F: Fulfillment> PurchaseArbiter<F> {
    /// Arbiter for a single unit of stock.
    #[must_use]
    pub fn new(fulfillment: F) -> Self {
        Self::with_stock(fulfillment, DEFAULT_STOCK)
    }

    /// Arbiter with an explicit initial stock. `0` models a misconfigured
    /// inventory where every attempt is immediately out of stock.
    #[must_use]
    pub fn with_stock(fulfillment: F, available: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ArbiterState {
                available,
                ..ArbiterState::default()
            })),
            fulfillment: Arc::new(fulfillment),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ArbiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt to purchase the item for `actor`.
    ///
    /// Preconditions are checked in precedence order - existing finality
    /// beats contention beats stock:
    ///
    /// 1. item already sold → `AlreadySold`
    /// 2. any attempt in flight → `Busy`
    /// 3. no units available → `OutOfStock`
    ///
    /// Otherwise the actor transitions to `processing` and the fulfillment
    /// backend is invoked; that await is the only suspension point. On
    /// success the sale is applied as a single locked transition; on
    /// failure only the `processing` flag is cleared. The flag is cleared
    /// even if the backend panics or this future is dropped mid-flight.
    pub async fn attempt_purchase(&self, actor: ActorId) -> Outcome {
        {
            let mut state = self.lock();
            if let Some(buyer) = state.sale {
                tracing::debug!(%actor, %buyer, "attempt rejected: item already sold");
                return Outcome::AlreadySold {
                    buyer_id: buyer,
                    own_purchase: buyer == actor,
                };
            }
            if state.any_processing() {
                tracing::debug!(%actor, "attempt rejected: another attempt in flight");
                return Outcome::Busy;
            }
            if state.available == 0 {
                tracing::debug!(%actor, "attempt rejected: out of stock");
                return Outcome::OutOfStock;
            }
            state.record_mut(actor).processing = true;
        }

        let guard = ProcessingGuard {
            state: Arc::clone(&self.state),
            actor,
            armed: true,
        };

        // A panicking backend must not leave the actor locked out or the
        // arbiter poisoned, so the call is unwind-isolated.
        let result = AssertUnwindSafe(self.fulfillment.complete(actor))
            .catch_unwind()
            .await;

        let outcome = {
            let mut state = self.lock();
            match result {
                Ok(Ok(())) => {
                    state.complete_sale(actor);
                    tracing::info!(buyer = %actor, "item sold");
                    Outcome::Success { buyer_id: actor }
                }
                Ok(Err(err)) => {
                    state.record_mut(actor).processing = false;
                    tracing::warn!(%actor, error = %err, "fulfillment failed; actor returned to idle");
                    Outcome::from(err)
                }
                Err(_panic) => {
                    state.record_mut(actor).processing = false;
                    tracing::warn!(%actor, "fulfillment panicked; actor returned to idle");
                    Outcome::UnknownError
                }
            }
        };
        guard.disarm();
        outcome
    }

    /// Current state for `actor`. Pure read: unknown actors get the derived
    /// default and no record is created.
    #[must_use]
    pub fn status(&self, actor: ActorId) -> ActorPurchaseState {
        self.lock().snapshot(actor)
    }

    /// Whether any actor's attempt is currently in flight.
    #[must_use]
    pub fn is_any_processing(&self) -> bool {
        self.lock().any_processing()
    }

    /// Units still available.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.lock().available
    }
}

/// Backstop that clears the `processing` flag if an in-flight attempt is
/// dropped before its transition is applied (caller cancellation). Normal
/// completion paths apply their transition under the lock and disarm it.
struct ProcessingGuard {
    state: Arc<Mutex<ArbiterState>>,
    actor: ActorId,
    armed: bool,
}

impl ProcessingGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = state.records.get_mut(&self.actor) {
            record.processing = false;
        }
    }
}
