use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::app::{Result, SkylightError};
use crate::domain::timefmt::format_relative_time;
use crate::domain::Post;

pub const DEFAULT_MAX_POSTS: usize = 1000;

/// What [`FeedCache::upsert`] did with an incoming post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Edited,
    Unchanged,
}

/// In-memory timeline cache: posts ordered oldest-first, with an id index
/// for O(1) lookup. Mutation goes through [`upsert`](FeedCache::upsert);
/// callers re-establish ordering with [`sort`](FeedCache::sort) after a
/// batch of upserts.
#[derive(Debug, Clone)]
pub struct FeedCache {
    posts: Vec<Post>,
    index: HashMap<String, usize>,
    max_size: usize,
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedCache {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_POSTS)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            posts: Vec::new(),
            index: HashMap::new(),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.index.get(id).map(|&i| &self.posts[i])
    }

    /// Insert a new post or reconcile it against the cached copy. An edited
    /// post replaces the cached one wholesale; an identical one is left
    /// alone entirely.
    pub fn upsert(&mut self, post: Post) -> UpsertOutcome {
        match self.index.get(&post.id) {
            Some(&i) => {
                if self.posts[i].is_edited_by(&post) {
                    self.posts[i] = post;
                    UpsertOutcome::Edited
                } else {
                    UpsertOutcome::Unchanged
                }
            }
            None => {
                self.index.insert(post.id.clone(), self.posts.len());
                self.posts.push(post);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Re-establish oldest-first ordering. The sort is stable, so posts
    /// sharing a timestamp keep their insertion order.
    pub fn sort(&mut self) {
        self.posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        self.rebuild_index();
    }

    /// Drop the oldest posts until the cache fits its cap. Returns how many
    /// were evicted. Assumes the cache is sorted.
    pub fn evict_to_cap(&mut self) -> usize {
        if self.posts.len() <= self.max_size {
            return 0;
        }
        let excess = self.posts.len() - self.max_size;
        self.posts.drain(..excess);
        self.rebuild_index();
        excess
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter()
    }

    pub fn snapshot(&self) -> Vec<Post> {
        self.posts.clone()
    }

    /// Re-render every post's relative time label against `now`, returning
    /// `(id, new_label)` only for posts whose label actually changed.
    pub fn refresh_display_times(&mut self, now: DateTime<Utc>) -> Vec<(String, String)> {
        let mut changed = Vec::new();
        for post in &mut self.posts {
            let label = format_relative_time(post.created_at, now);
            if label != post.display_time {
                post.display_time = label.clone();
                changed.push((post.id.clone(), label));
            }
        }
        changed
    }

    /// Consistency checks run after every merge: unique ids, non-decreasing
    /// timestamps, size within the cap.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.posts.len());
        for post in &self.posts {
            if !seen.insert(post.id.as_str()) {
                return Err(SkylightError::CacheInvariant(format!(
                    "duplicate post id {}",
                    post.id
                )));
            }
        }
        if let Some(pair) = self
            .posts
            .windows(2)
            .find(|pair| pair[0].created_at > pair[1].created_at)
        {
            return Err(SkylightError::CacheInvariant(format!(
                "out-of-order posts: {} after {}",
                pair[1].id, pair[0].id
            )));
        }
        if self.posts.len() > self.max_size {
            return Err(SkylightError::CacheInvariant(format!(
                "cache size {} exceeds cap {}",
                self.posts.len(),
                self.max_size
            )));
        }
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .posts
            .iter()
            .enumerate()
            .map(|(i, post)| (post.id.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Counters;
    use chrono::Duration;

    fn base_time() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    fn post(id: &str, minutes_ago: i64) -> Post {
        let created_at = base_time() - Duration::minutes(minutes_ago);
        Post {
            id: id.into(),
            revision_key: format!("cid-{id}"),
            author_display_name: "Alice".into(),
            author_handle: "alice.bsky.social".into(),
            text: format!("post {id}"),
            created_at,
            display_time: format_relative_time(created_at, base_time()),
            counters: Counters::default(),
            is_own_post: false,
            thread_parent: None,
            thread_root: None,
            quote_of: None,
            link_spans: Vec::new(),
        }
    }

    #[test]
    fn test_upsert_outcomes() {
        let mut cache = FeedCache::new();
        let original = post("a", 10);

        assert_eq!(cache.upsert(original.clone()), UpsertOutcome::Inserted);
        assert_eq!(cache.upsert(original.clone()), UpsertOutcome::Unchanged);

        let mut edited = original;
        edited.counters.likes = 5;
        assert_eq!(cache.upsert(edited), UpsertOutcome::Edited);
        assert_eq!(cache.get("a").unwrap().counters.likes, 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sort_is_oldest_first() {
        let mut cache = FeedCache::new();
        cache.upsert(post("new", 1));
        cache.upsert(post("old", 60));
        cache.upsert(post("mid", 30));
        cache.sort();

        let ids: Vec<&str> = cache.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["old", "mid", "new"]);
        // The index follows the new order.
        assert_eq!(cache.get("old").unwrap().id, "old");
    }

    #[test]
    fn test_sort_keeps_insertion_order_on_ties() {
        let mut cache = FeedCache::new();
        cache.upsert(post("first", 10));
        cache.upsert(post("second", 10));
        cache.sort();

        let ids: Vec<&str> = cache.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }

    #[test]
    fn test_evict_oldest_to_cap() {
        let mut cache = FeedCache::with_max_size(2);
        cache.upsert(post("a", 30));
        cache.upsert(post("b", 20));
        cache.upsert(post("c", 10));
        cache.sort();

        assert_eq!(cache.evict_to_cap(), 1);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_refresh_display_times_reports_only_changes() {
        let mut cache = FeedCache::new();
        cache.upsert(post("a", 5));
        cache.upsert(post("b", 30));

        let later = base_time() + Duration::minutes(40);
        let changed = cache.refresh_display_times(later);

        assert_eq!(changed.len(), 2);
        assert_eq!(cache.get("a").unwrap().display_time, "45m ago");

        // A second refresh at the same instant changes nothing.
        assert!(cache.refresh_display_times(later).is_empty());
    }

    #[test]
    fn test_invariant_rejects_duplicates() {
        let mut cache = FeedCache::new();
        cache.upsert(post("a", 10));
        // Bypass upsert to simulate a corrupted state.
        cache.posts.push(post("a", 5));
        assert!(cache.check_invariants().is_err());
    }

    #[test]
    fn test_invariant_rejects_disorder() {
        let mut cache = FeedCache::new();
        cache.upsert(post("new", 1));
        cache.upsert(post("old", 60));
        // Unsorted after raw upserts.
        assert!(cache.check_invariants().is_err());
        cache.sort();
        cache.check_invariants().unwrap();
    }
}
