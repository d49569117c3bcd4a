//! Scope-aware querying over long-term memories.

mod engine;

pub use engine::*;
