use thiserror::Error;

/// Failures the engine can report to a transport.
///
/// "Nothing found" is not represented here: an empty search is `Ok(vec![])`
/// and a page without a usable link is `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Bad query or URL supplied by the user.
    #[error("{0}")]
    Validation(String),

    #[error("rate limit exceeded")]
    RateLimited,

    /// Connection, timeout, TLS or non-2xx response from the catalog site.
    #[error("request to {url} failed: {reason}")]
    Network {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// The response body is not an HTML document at all.
    #[error("could not parse page at {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn network(url: impl ToString, status: Option<u16>, reason: impl Into<String>) -> Self {
        EngineError::Network {
            url: url.to_string(),
            status,
            reason: reason.into(),
        }
    }

    /// HTTP status of the failed fetch, when the origin answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Network { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
