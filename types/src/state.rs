use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// Snapshot of one actor's purchase record.
///
/// Readers always receive a copy taken under the arbiter's lock, so the
/// three fields are mutually consistent: either all pre-transition or all
/// post-transition values, never a mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActorPurchaseState {
    /// True once the item has been sold to any actor.
    pub sold: bool,
    /// The actor the item was sold to. Set exactly when `sold` is true.
    pub buyer_id: Option<ActorId>,
    /// True while this actor's attempt is in flight.
    pub processing: bool,
}

impl ActorPurchaseState {
    /// Whether `actor` is the one who completed the sale.
    #[must_use]
    pub fn is_buyer(self, actor: ActorId) -> bool {
        self.buyer_id == Some(actor)
    }

    /// Whether this actor is free to start an attempt, as far as its own
    /// record is concerned (global contention is the arbiter's call).
    #[must_use]
    pub fn is_idle(self) -> bool {
        !self.sold && !self.processing
    }
}
