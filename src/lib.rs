//! # Skylight
//!
//! A timeline reconciliation engine for a Bluesky feed.
//!
//! ## Architecture
//!
//! Skylight follows a modular pipeline architecture:
//!
//! ```text
//! FeedClient → Normalizer → ReconciliationEngine → FeedCache → Sink
//! ```
//!
//! - [`client`]: XRPC client fetching "most recent N" timeline snapshots
//! - [`normalizer`]: Converts raw feed entries to the unified [`Post`](domain::Post) model
//! - [`timeline`]: Local ordered cache plus the merge algorithm
//! - [`scheduler`]: Periodic fetch and display-label refresh timers
//!
//! ## Quick Start
//!
//! ```bash
//! # Run one fetch/merge cycle and print the merged timeline
//! skylight fetch
//!
//! # Keep the timeline fresh on the configured interval
//! skylight watch
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// feed client, normalizer, reconciliation engine, settings.
pub mod app;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `fetch` - Run one reconciliation cycle
/// - `watch` - Run the auto-refresh scheduler until interrupted
pub mod cli;

/// Remote feed access.
///
/// - [`FeedClient`](client::FeedClient): Async trait for timeline snapshots
/// - [`XrpcFeedClient`](client::xrpc::XrpcFeedClient): reqwest-based implementation
/// - [`raw`](client::raw): Wire types for `app.bsky.feed.getTimeline`
pub mod client;

/// Configuration management.
///
/// Loads from `~/.config/skylight/config.toml`; live timeline settings are
/// shared through [`SettingsHandle`](config::settings::SettingsHandle) and
/// observed via explicit subscriptions rather than a global singleton.
pub mod config;

/// Core domain models.
///
/// - [`Post`](domain::Post): Canonical timeline post with thread linkage,
///   quote outcome and link spans
/// - [`QuoteOutcome`](domain::QuoteOutcome): Found / NotFound / Blocked
pub mod domain;

/// Feed entry normalization.
///
/// Converts one raw feed entry into a [`Post`](domain::Post), extracting
/// reply threading, quoted-record summaries and rich-text link spans.
pub mod normalizer;

/// Periodic refresh.
///
/// [`AutoRefreshScheduler`](scheduler::AutoRefreshScheduler) drives fetch
/// cycles on a clamped interval and refreshes relative-time labels once a
/// minute.
pub mod scheduler;

/// Timeline cache and reconciliation.
///
/// - [`FeedCache`](timeline::FeedCache): URI-keyed, ordered, capped store
/// - [`ReconciliationEngine`](timeline::ReconciliationEngine): Idempotent
///   merge of fetched batches with selection preservation
pub mod timeline;
