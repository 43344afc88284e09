use thiserror::Error;

/// Failure of a translation request.
///
/// Every kind drives the retry loop the same way, except `RateLimited`, which
/// waits longer before the next attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    /// Transport failure or per-attempt timeout
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response other than 429
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// HTTP 429 from the provider
    #[error("rate limit exceeded (429)")]
    RateLimited,

    /// Response body did not have the expected shape
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl TranslationError {
    /// Whether this error should use the longer rate-limit wait.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, TranslationError::RateLimited)
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TranslationError::Api { status, .. } => Some(*status),
            TranslationError::RateLimited => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TranslationError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            TranslationError::Parse(err.to_string())
        } else {
            TranslationError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(err: serde_json::Error) -> Self {
        TranslationError::Parse(err.to_string())
    }
}
