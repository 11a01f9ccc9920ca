//! GitHub API error types.

use thiserror::Error;

use crate::catalog::InvalidRateLimitHeader;
use crate::http::HttpError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The transport failed before a response was received.
    #[error("HTTP error: {0}")]
    Transport(#[from] HttpError),

    /// A response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The GraphQL endpoint reported errors in its response body.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// The client's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    InvalidRateLimitHeader(#[from] InvalidRateLimitHeader),
}

impl GitHubError {
    /// Create an API error.
    #[inline]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of an API error.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    #[inline]
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    #[inline]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Network failures, 5xx responses and 429s.
    #[inline]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Pull the `message` field out of a GitHub error body, falling back to the
/// raw body text.
pub(crate) fn error_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_helpers_classify_api_errors() {
        assert!(GitHubError::api(404, "Not Found").is_not_found());
        assert!(GitHubError::api(403, "Forbidden").is_forbidden());
        assert!(GitHubError::api(401, "Bad credentials").is_unauthorized());
        assert_eq!(GitHubError::Cancelled.status(), None);
    }

    #[test]
    fn transient_errors_cover_network_server_and_throttling() {
        assert!(GitHubError::Transport(HttpError::Transport("reset".into())).is_transient());
        assert!(GitHubError::api(503, "unavailable").is_transient());
        assert!(GitHubError::api(429, "slow down").is_transient());
        assert!(!GitHubError::api(422, "invalid").is_transient());
        assert!(!GitHubError::Cancelled.is_transient());
        assert!(!GitHubError::GraphQl("boom".into()).is_transient());
    }

    #[test]
    fn error_message_prefers_json_message_field() {
        let body = br#"{"message":"Not Found","documentation_url":"https://docs.github.com"}"#;
        assert_eq!(error_message(body), "Not Found");
        assert_eq!(error_message(b"  upstream exploded \n"), "upstream exploded");
    }
}
