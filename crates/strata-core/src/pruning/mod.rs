//! Rule-driven pruning of long-term memories and observations.

mod engine;

pub use engine::*;
