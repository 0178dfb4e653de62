pub mod cache;
pub mod reconcile;

pub use cache::{FeedCache, UpsertOutcome, DEFAULT_MAX_POSTS};
pub use reconcile::{MergeResult, ReconciliationEngine};
