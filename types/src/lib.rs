//! Core domain types for Dibs.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the
//! application: the arbiter core, a presentation layer, or test harnesses.

mod ids;
mod outcome;
mod state;

pub use ids::ActorId;
pub use outcome::{FulfillmentError, Outcome};
pub use state::ActorPurchaseState;
