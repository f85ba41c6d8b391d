use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures talking to the simpyl backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connection refused, timeout, ...).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    pub(crate) fn transport(url: &reqwest::Url, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// True for connection-level failures, as opposed to a reply the client did not like.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
