//! Wire types for `app.bsky.feed.getTimeline`.
//!
//! Only the fields the normalizer consumes are modeled; everything else in
//! the response is ignored. Embed and facet-feature unions are tagged on
//! `$type`, with a catch-all variant so unknown lexicon types deserialize
//! instead of failing the entry.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub feed: Vec<RawFeedEntry>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// One element of the timeline feed: a post view plus embedding/threading
/// metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeedEntry {
    pub post: RawPostView,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPostView {
    pub uri: String,
    pub cid: String,
    pub author: RawAuthor,
    pub record: RawPostRecord,
    #[serde(default)]
    pub embed: Option<RawEmbedView>,
    pub indexed_at: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub repost_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuthor {
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPostRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reply: Option<RawReplyRef>,
    #[serde(default)]
    pub facets: Option<Vec<RawFacet>>,
}

/// Reply descriptor. The lexicon requires both refs, but feeds have been
/// seen without an explicit root, so both stay optional here.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReplyRef {
    #[serde(default)]
    pub parent: Option<RawStrongRef>,
    #[serde(default)]
    pub root: Option<RawStrongRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStrongRef {
    pub uri: String,
    pub cid: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFacet {
    pub index: RawByteSlice,
    pub features: Vec<RawFacetFeature>,
}

/// Byte range into the post text. Start inclusive, end exclusive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum RawFacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum RawEmbedView {
    #[serde(rename = "app.bsky.embed.record#view")]
    Record(RawRecordView),
    #[serde(rename = "app.bsky.embed.recordWithMedia#view")]
    RecordWithMedia(RawRecordWithMediaView),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRecordView {
    pub record: RawEmbeddedRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRecordWithMediaView {
    pub record: RawRecordView,
}

/// The quoted record inside an embed view: resolvable, taken down, blocked,
/// or some record type we do not model (lists, starter packs, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum RawEmbeddedRecord {
    #[serde(rename = "app.bsky.embed.record#viewRecord")]
    ViewRecord(RawViewRecord),
    #[serde(rename = "app.bsky.embed.record#viewNotFound")]
    ViewNotFound { uri: String },
    #[serde(rename = "app.bsky.embed.record#viewBlocked")]
    ViewBlocked { uri: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawViewRecord {
    pub uri: String,
    pub cid: String,
    pub author: RawAuthor,
    /// The post record itself lives under `value` in view records.
    pub value: RawPostRecord,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub repost_count: u64,
}
