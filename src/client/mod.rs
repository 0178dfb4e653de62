pub mod raw;
pub mod xrpc;

use async_trait::async_trait;

use crate::app::Result;
use crate::client::raw::RawFeedEntry;

/// Bounds on how many posts one snapshot may request; the service rejects
/// anything outside this range.
pub const MIN_FETCH_COUNT: usize = 1;
pub const MAX_FETCH_COUNT: usize = 100;

/// Source of timeline snapshots: up to `limit` most-recent feed entries in
/// raw form. The production implementation talks XRPC; tests substitute a
/// canned one.
#[async_trait]
pub trait FeedClient {
    async fn fetch_timeline(&self, limit: usize) -> Result<Vec<RawFeedEntry>>;
}
