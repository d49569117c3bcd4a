//! Relevance scoring for observations and memories.

mod relevance;

pub use relevance::*;
