use thiserror::Error;

/// Failures raised by a catalog client. Any of these on a write is retried by
/// the batch engine; on a read it propagates to the caller.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("missing Plex base URL or token")]
    MissingCredentials,

    #[error("{0}")]
    Remote(String),
}

impl SourceError {
    pub fn remote(message: impl Into<String>) -> Self {
        SourceError::Remote(message.into())
    }

    /// HTTP status code, when the failure came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
