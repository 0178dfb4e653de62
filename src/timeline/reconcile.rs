use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::app::{Result, SkylightError};
use crate::domain::Post;
use crate::timeline::cache::{FeedCache, UpsertOutcome};

/// Outcome of one merge: what changed and whether the previously selected
/// post survived.
#[derive(Debug, Default)]
pub struct MergeResult {
    pub added: Vec<Post>,
    pub edited: Vec<Post>,
    /// The previously selected post's id, if it is still in the cache.
    pub reselected_id: Option<String>,
}

impl MergeResult {
    pub fn status_line(&self) -> String {
        format!("{} new, {} edited", self.added.len(), self.edited.len())
    }
}

/// Guard for a fetch-merge cycle. Holding one means no other cycle may
/// start; dropping it releases the slot.
pub struct CycleGuard<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Merges normalized snapshots into the cache.
///
/// A snapshot is reconciled, never applied: posts already cached are
/// compared and replaced only on edit, fresh posts are inserted, and the
/// whole cache is re-sorted and capped afterwards. If the post-merge
/// consistency check fails, the cache is restored to its pre-merge state.
pub struct ReconciliationEngine {
    cache: Mutex<FeedCache>,
    in_flight: AtomicBool,
}

impl ReconciliationEngine {
    pub fn new(cache: FeedCache) -> Self {
        Self {
            cache: Mutex::new(cache),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Claim the single fetch-merge slot. Returns `None` when a cycle is
    /// already running, in which case the caller skips this tick.
    pub fn begin_cycle(&self) -> Option<CycleGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CycleGuard {
                in_flight: &self.in_flight,
            })
    }

    pub fn merge(
        &self,
        batch: Vec<Post>,
        previously_selected_id: Option<&str>,
    ) -> Result<MergeResult> {
        let mut cache = self.lock_cache()?;
        let rollback = cache.clone();

        let mut result = MergeResult::default();

        // Known posts first, then fresh ones. A duplicate id within the
        // batch lands in the fresh pass and reconciles like a known post.
        let (known, fresh): (Vec<Post>, Vec<Post>) = batch
            .into_iter()
            .partition(|post| cache.contains(&post.id));

        for post in known {
            if cache.upsert(post.clone()) == UpsertOutcome::Edited {
                result.edited.push(post);
            }
        }
        for post in fresh {
            match cache.upsert(post.clone()) {
                UpsertOutcome::Inserted => result.added.push(post),
                UpsertOutcome::Edited => result.edited.push(post),
                UpsertOutcome::Unchanged => {}
            }
        }

        cache.sort();
        let evicted = cache.evict_to_cap();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted oldest posts past cache cap");
        }

        if let Err(e) = cache.check_invariants() {
            *cache = rollback;
            tracing::error!("merge rolled back: {e}");
            return Err(e);
        }

        result.reselected_id = previously_selected_id
            .filter(|id| cache.contains(id))
            .map(str::to_string);

        tracing::info!(
            added = result.added.len(),
            edited = result.edited.len(),
            total = cache.len(),
            "merged timeline snapshot"
        );
        Ok(result)
    }

    /// Current timeline, oldest first.
    pub fn timeline(&self) -> Result<Vec<Post>> {
        Ok(self.lock_cache()?.snapshot())
    }

    pub fn refresh_display_times(&self, now: DateTime<Utc>) -> Result<Vec<(String, String)>> {
        Ok(self.lock_cache()?.refresh_display_times(now))
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, FeedCache>> {
        self.cache
            .lock()
            .map_err(|_| SkylightError::CacheInvariant("cache lock poisoned".into()))
    }
}
