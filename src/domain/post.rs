use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engagement counters attached to a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub likes: u64,
    pub replies: u64,
    pub reposts: u64,
}

/// Reference to another record in the feed (a reply parent or root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub content_key: String,
}

/// Flattened summary of a quoted post, carried inline so the quoting post
/// can be rendered without another fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub author_display_name: String,
    pub author_handle: String,
    pub text: String,
    pub uri: String,
    pub content_key: String,
    pub likes: u64,
    pub reposts: u64,
}

/// What a post's embed resolved to. The service may refuse to hand over the
/// quoted record, so "taken down" and "blocked" are explicit outcomes rather
/// than the absence of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteOutcome {
    Found(QuoteSummary),
    NotFound,
    Blocked,
}

/// A link annotation over a byte range of the post text. Ranges come from
/// rich-text facets when present, otherwise from a URL scan of the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpan {
    pub start: usize,
    pub end: usize,
    pub uri: String,
}

/// One canonical timeline post.
///
/// Built only by the normalizer from a single raw feed entry, and replaced
/// wholesale when reconciliation detects an edit. `display_time` is the one
/// field the cache rewrites in place, on display-timer ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// AT URI of the post; primary key within the cache.
    pub id: String,
    /// CID of the record. Informational only; edit detection compares
    /// fields, never this key.
    pub revision_key: String,
    pub author_display_name: String,
    pub author_handle: String,
    pub text: String,
    /// Source of truth for timeline ordering.
    pub created_at: DateTime<Utc>,
    /// Relative rendering of `created_at`, e.g. "5m ago".
    pub display_time: String,
    pub counters: Counters,
    pub is_own_post: bool,
    pub thread_parent: Option<RecordRef>,
    pub thread_root: Option<RecordRef>,
    pub quote_of: Option<QuoteOutcome>,
    pub link_spans: Vec<LinkSpan>,
}

impl Post {
    /// Whether `incoming` (same id) should replace this post. Text and
    /// counter changes both count; counter-only bumps are not distinguished
    /// from content edits here.
    pub fn is_edited_by(&self, incoming: &Post) -> bool {
        self.text != incoming.text || self.counters != incoming.counters
    }
}
