pub mod engine;
pub mod queue;

pub use engine::{FeedEngine, FeedStatus, LoadMoreOutcome};
pub use queue::PendingQueue;
