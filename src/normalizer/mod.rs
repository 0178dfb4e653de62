use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::app::{Result, SkylightError};
use crate::client::raw::{
    RawEmbedView, RawEmbeddedRecord, RawFacet, RawFacetFeature, RawFeedEntry, RawReplyRef,
    RawStrongRef,
};
use crate::domain::timefmt::format_relative_time;
use crate::domain::{Counters, LinkSpan, Post, QuoteOutcome, QuoteSummary, RecordRef};

/// Matches `http(s)://…` URLs and bare `www.…` hosts, greedily consuming
/// common URL characters. Used only when a record carries no facets.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://(?:[-\w.]|(?:%[\da-fA-F]{2}))+(?:/[-\w%!./?=&#+]*)*)|(?:www\.(?:[-\w.]|(?:%[\da-fA-F]{2}))+(?:/[-\w%!./?=&#+]*)*)",
    )
    .expect("URL pattern is valid")
});

/// Converts raw feed entries into canonical [`Post`] records.
///
/// Normalization never fails on missing optional fields; only an
/// unparseable timestamp fails an entry, and then only that entry.
#[derive(Clone)]
pub struct Normalizer {
    authenticated_handle: String,
}

impl Normalizer {
    pub fn new(authenticated_handle: impl Into<String>) -> Self {
        Self {
            authenticated_handle: authenticated_handle.into(),
        }
    }

    /// Normalize a whole snapshot. Malformed entries are skipped with a
    /// warning; the rest of the batch goes through.
    pub fn normalize_batch(&self, entries: &[RawFeedEntry], now: DateTime<Utc>) -> Vec<Post> {
        let mut posts = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.normalize(entry, now) {
                Ok(post) => posts.push(post),
                Err(e) => {
                    tracing::warn!(uri = %entry.post.uri, "skipping malformed feed entry: {e}");
                }
            }
        }
        posts
    }

    pub fn normalize(&self, entry: &RawFeedEntry, now: DateTime<Utc>) -> Result<Post> {
        let view = &entry.post;

        let created_at = DateTime::parse_from_rfc3339(&view.indexed_at)
            .map_err(|e| {
                SkylightError::Normalize(format!("bad timestamp {:?}: {e}", view.indexed_at))
            })?
            .with_timezone(&Utc);

        let author_handle = view.author.handle.clone();
        let author_display_name = display_name_or_handle(
            view.author.display_name.as_deref(),
            &author_handle,
        );

        let (thread_parent, thread_root) = extract_thread(view.record.reply.as_ref());

        Ok(Post {
            id: view.uri.clone(),
            revision_key: view.cid.clone(),
            author_display_name,
            is_own_post: author_handle == self.authenticated_handle,
            author_handle,
            text: view.record.text.clone(),
            created_at,
            display_time: format_relative_time(created_at, now),
            counters: Counters {
                likes: view.like_count,
                replies: view.reply_count,
                reposts: view.repost_count,
            },
            thread_parent,
            thread_root,
            quote_of: extract_quote(view.embed.as_ref()),
            link_spans: extract_link_spans(&view.record.text, view.record.facets.as_deref()),
        })
    }
}

fn display_name_or_handle(display_name: Option<&str>, handle: &str) -> String {
    match display_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => handle.to_string(),
    }
}

fn record_ref(strong_ref: &RawStrongRef) -> RecordRef {
    RecordRef {
        uri: strong_ref.uri.clone(),
        content_key: strong_ref.cid.clone(),
    }
}

/// The root falls back to the parent when the feed omits it. For a reply
/// two levels deep this can label the wrong post as root; kept as-is for
/// compatibility with records already written this way.
fn extract_thread(reply: Option<&RawReplyRef>) -> (Option<RecordRef>, Option<RecordRef>) {
    let Some(reply) = reply else {
        return (None, None);
    };
    let parent = reply.parent.as_ref().map(record_ref);
    let root = reply.root.as_ref().map(record_ref).or_else(|| parent.clone());
    (parent, root)
}

fn extract_quote(embed: Option<&RawEmbedView>) -> Option<QuoteOutcome> {
    let record = match embed? {
        RawEmbedView::Record(view) => &view.record,
        RawEmbedView::RecordWithMedia(view) => &view.record.record,
        RawEmbedView::Other => return None,
    };

    match record {
        RawEmbeddedRecord::ViewRecord(quoted) => Some(QuoteOutcome::Found(QuoteSummary {
            author_display_name: display_name_or_handle(
                quoted.author.display_name.as_deref(),
                &quoted.author.handle,
            ),
            author_handle: quoted.author.handle.clone(),
            text: quoted.value.text.clone(),
            uri: quoted.uri.clone(),
            content_key: quoted.cid.clone(),
            likes: quoted.like_count,
            reposts: quoted.repost_count,
        })),
        RawEmbeddedRecord::ViewNotFound { .. } => Some(QuoteOutcome::NotFound),
        RawEmbeddedRecord::ViewBlocked { .. } => Some(QuoteOutcome::Blocked),
        RawEmbeddedRecord::Other => None,
    }
}

/// Facets are authoritative when they yield link spans; the textual URL
/// scan only runs when they don't (matching how the desktop client
/// resolved links before facets were reliably populated).
fn extract_link_spans(text: &str, facets: Option<&[RawFacet]>) -> Vec<LinkSpan> {
    let mut spans: Vec<LinkSpan> = facets
        .unwrap_or_default()
        .iter()
        .flat_map(|facet| {
            facet.features.iter().filter_map(|feature| match feature {
                RawFacetFeature::Link { uri } => Some(LinkSpan {
                    start: facet.index.byte_start,
                    end: facet.index.byte_end,
                    uri: uri.clone(),
                }),
                RawFacetFeature::Other => None,
            })
        })
        .collect();

    if !spans.is_empty() {
        spans.sort_by_key(|span| span.start);
        return spans;
    }

    URL_PATTERN
        .find_iter(text)
        .map(|m| LinkSpan {
            start: m.start(),
            end: m.end(),
            uri: m.as_str().to_string(),
        })
        .collect()
}
