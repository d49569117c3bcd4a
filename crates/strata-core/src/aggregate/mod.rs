//! Cross-analyzer observation aggregation.

mod aggregator;

pub use aggregator::*;
