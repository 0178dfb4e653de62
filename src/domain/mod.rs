pub mod post;
pub mod timefmt;

pub use post::{Counters, LinkSpan, Post, QuoteOutcome, QuoteSummary, RecordRef};
