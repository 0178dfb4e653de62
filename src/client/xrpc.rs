use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::app::{Result, SkylightError};
use crate::client::raw::{RawFeedEntry, TimelineResponse};
use crate::client::{FeedClient, MAX_FETCH_COUNT, MIN_FETCH_COUNT};

/// XRPC implementation of [`FeedClient`] against a Bluesky-compatible
/// service. Owns the request timeout; does not retry — a failed cycle is
/// simply retried on the next scheduler tick.
pub struct XrpcFeedClient {
    http: Client,
    service: Url,
    access_token: String,
}

impl XrpcFeedClient {
    pub fn new(service: &str, access_token: impl Into<String>) -> Result<Self> {
        let service = Url::parse(service)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("skylight/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Ok(Self {
            http,
            service,
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl FeedClient for XrpcFeedClient {
    async fn fetch_timeline(&self, limit: usize) -> Result<Vec<RawFeedEntry>> {
        let limit = limit.clamp(MIN_FETCH_COUNT, MAX_FETCH_COUNT);
        let url = self.service.join("xrpc/app.bsky.feed.getTimeline")?;

        let response = self
            .http
            .get(url)
            .query(&[("limit", limit.to_string())])
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        // An expired or revoked session comes back as 401; everything else
        // is a transport failure owned by the next tick.
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(SkylightError::AuthInvalid(body));
        }

        let response = response.error_for_status()?;
        let timeline: TimelineResponse = response.json().await?;
        tracing::debug!(count = timeline.feed.len(), "fetched timeline snapshot");

        Ok(timeline.feed)
    }
}
