use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::ActorId;

/// Failure reported by a fulfillment backend.
///
/// Both variants are recoverable: the arbiter returns the actor to idle and
/// the caller decides whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FulfillmentError {
    /// The backend declined the purchase and said why.
    #[error("{reason}")]
    Declined { reason: String },
    /// The backend failed without a structured reason.
    #[error("fulfillment failed without a reason")]
    Unknown,
}

/// Result of one `attempt_purchase` call.
///
/// `AlreadySold`, `Busy` and `OutOfStock` are precondition rejections, not
/// errors: expected terminal or contended states, surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The item was sold before this attempt got anywhere.
    AlreadySold {
        buyer_id: ActorId,
        /// True when the caller is the buyer re-attempting after winning.
        own_purchase: bool,
    },
    /// Another attempt is in flight; retry later.
    Busy,
    /// No units available and no sale recorded (misconfigured inventory).
    OutOfStock,
    /// This attempt won the item.
    Success { buyer_id: ActorId },
    /// Fulfillment declined the purchase; the actor is idle again.
    Failed { reason: String },
    /// Fulfillment failed without a usable reason, or faulted unexpectedly.
    UnknownError,
}

impl Outcome {
    /// User-facing message for this outcome, rendered by the presentation
    /// layer as-is.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::AlreadySold {
                own_purchase: true, ..
            } => "You already purchased this item.".to_string(),
            Self::AlreadySold { buyer_id, .. } => {
                format!("This item has already been sold to actor {buyer_id}.")
            }
            Self::Busy => {
                "A purchase is already being attempted. Please try again later.".to_string()
            }
            Self::OutOfStock => "Product out of stock!".to_string(),
            Self::Success { buyer_id } => {
                format!("Purchase completed successfully for actor {buyer_id}!")
            }
            Self::Failed { reason } => reason.clone(),
            Self::UnknownError => "An unknown error occurred.".to_string(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether this outcome is a precondition rejection rather than the
    /// result of a fulfillment call.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadySold { .. } | Self::Busy | Self::OutOfStock
        )
    }
}

impl From<FulfillmentError> for Outcome {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::Declined { reason } => Self::Failed { reason },
            FulfillmentError::Unknown => Self::UnknownError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActorId, FulfillmentError, Outcome};

    #[test]
    fn already_sold_message_distinguishes_the_buyer() {
        let own = Outcome::AlreadySold {
            buyer_id: ActorId::new(1),
            own_purchase: true,
        };
        let other = Outcome::AlreadySold {
            buyer_id: ActorId::new(1),
            own_purchase: false,
        };
        assert_eq!(own.message(), "You already purchased this item.");
        assert_eq!(
            other.message(),
            "This item has already been sold to actor 1."
        );
    }

    #[test]
    fn success_message_names_the_buyer() {
        let outcome = Outcome::Success {
            buyer_id: ActorId::new(7),
        };
        assert_eq!(
            outcome.message(),
            "Purchase completed successfully for actor 7!"
        );
        assert!(outcome.is_success());
        assert!(!outcome.is_rejection());
    }

    #[test]
    fn failed_message_surfaces_the_reason_verbatim() {
        let outcome = Outcome::Failed {
            reason: "card declined".to_string(),
        };
        assert_eq!(outcome.message(), "card declined");
    }

    #[test]
    fn rejections_are_classified_as_rejections() {
        assert!(Outcome::Busy.is_rejection());
        assert!(Outcome::OutOfStock.is_rejection());
        assert!(!Outcome::UnknownError.is_rejection());
        assert!(
            !Outcome::Failed {
                reason: String::new()
            }
            .is_rejection()
        );
    }

    #[test]
    fn fulfillment_errors_map_onto_outcomes() {
        let declined = FulfillmentError::Declined {
            reason: "insufficient funds".to_string(),
        };
        assert_eq!(
            Outcome::from(declined),
            Outcome::Failed {
                reason: "insufficient funds".to_string()
            }
        );
        assert_eq!(Outcome::from(FulfillmentError::Unknown), Outcome::UnknownError);
    }
}
