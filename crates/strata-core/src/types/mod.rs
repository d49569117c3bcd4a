//! Core types for strata.

mod memory;
mod observation;
mod scope;

pub use memory::*;
pub use observation::*;
pub use scope::*;
