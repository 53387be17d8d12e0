//! Purchase arbitration for a single-unit shared resource.
//!
//! # Architecture
//!
//! The crate is organized around one owner of mutable state and one seam:
//!
//! - [`PurchaseArbiter`] - owns the per-actor records and the inventory
//!   counter, and serializes every concurrent attempt through a single
//!   critical section
//! - [`Fulfillment`] - capability trait for the asynchronous backend that
//!   finalizes or rejects an attempt
//! - [`SimulatedFulfillment`] - latency-bearing backend with a fixed
//!   failure probability, the production stand-in
//! - [`StubFulfillment`] - deterministic zero-delay backend for tests
//!
//! # Outcomes
//!
//! Every attempt resolves to exactly one [`Outcome`](dibs_types::Outcome):
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `AlreadySold` | The item was sold before this attempt got anywhere |
//! | `Busy` | Another attempt is in flight; retry later |
//! | `OutOfStock` | No units available and no sale recorded |
//! | `Success` | This attempt won the item |
//! | `Failed` | Fulfillment declined; the actor is idle again |
//! | `UnknownError` | Fulfillment failed without a reason, or faulted |
//!
//! # Error Handling
//!
//! Nothing in this crate is fatal. Precondition rejections are ordinary
//! outcomes, fulfillment failures return the actor to idle, and a panicking
//! backend is contained and reported as `UnknownError`.

pub mod arbiter;
pub mod fulfillment;

pub use arbiter::{DEFAULT_STOCK, PurchaseArbiter};
pub use fulfillment::{Fulfillment, SimulatedFulfillment, StubFulfillment};

pub use dibs_types;
