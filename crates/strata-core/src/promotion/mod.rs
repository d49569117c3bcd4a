//! Threshold-driven promotion between hierarchy tiers.

mod engine;
mod events;

pub use engine::*;
pub use events::*;
