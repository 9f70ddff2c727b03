pub mod aggregator;
pub mod pipeline;
pub mod source;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregator::{aggregate, AggregateState, Collected};
pub use pipeline::{Analyst, RunOutcome, RunStats};
pub use source::{Batch, FeedSource, PostSource};
