//! Store traits and boundary types.
//!
//! Persistence lives outside this crate. The engines talk to two async
//! traits, one per tier, and express business-level promotion results as
//! [`PromoteOutcome`] values rather than errors.

mod memories;
mod observations;

pub use memories::*;
pub use observations::*;
