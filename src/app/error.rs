use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkylightError {
    /// Network, HTTP or response-decoding failure while talking to the
    /// service. Recovered by skipping the cycle; the cache stays untouched.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The session is no longer accepted by the service. The scheduler
    /// suspends until re-authentication.
    #[error("Authentication is no longer valid: {0}")]
    AuthInvalid(String),

    /// A single feed entry could not be normalized. Fails the entry, never
    /// the batch.
    #[error("Failed to normalize feed entry: {0}")]
    Normalize(String),

    /// A post-merge consistency check failed. The merge is rolled back;
    /// this indicates a programming error, not bad input.
    #[error("Cache invariant violated: {0}")]
    CacheInvariant(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not authenticated: set service.handle and service.access_token")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, SkylightError>;
