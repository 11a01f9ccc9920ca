use thiserror::Error;

use crate::catalog::ResourceTypeTag;
use crate::github::GitHubError;

/// Errors surfaced by connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The upstream rejected the configured credential.
    #[error("authentication failed: {message}")]
    Unauthenticated { message: String },

    /// Validation found no organization where the caller is an administrator.
    #[error("access token must be an admin on at least one organization")]
    NoAdministeredOrganization,

    /// An explicitly configured organization is not administered by the caller.
    #[error("access token must be an admin on the {org} organization")]
    NotOrgAdmin { org: String },

    /// A resource id did not decode into its expected form.
    #[error("malformed resource id {id:?}: {reason}")]
    MalformedId { id: String, reason: String },

    /// A page token could not be decoded.
    #[error("invalid page token: {message}")]
    InvalidPageToken { message: String },

    /// A structural precondition of an operation does not hold.
    #[error("{message}")]
    InvariantViolation { message: String },

    /// An asset reference failed validation.
    #[error("invalid asset url {url:?}: {reason}")]
    InvalidAssetUrl { url: String, reason: String },

    /// The resource type does not implement this operation.
    #[error("{operation} is not supported for {resource_type} resources")]
    Unsupported {
        operation: &'static str,
        resource_type: ResourceTypeTag,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Any other upstream failure, propagated as-is.
    #[error(transparent)]
    Upstream(GitHubError),
}

impl ConnectorError {
    /// Create a malformed id error.
    #[inline]
    pub fn malformed_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invariant violation error.
    #[inline]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create an invalid page token error.
    #[inline]
    pub fn invalid_page_token(message: impl Into<String>) -> Self {
        Self::InvalidPageToken {
            message: message.into(),
        }
    }

    /// Whether an orchestrator may retry the failed call.
    ///
    /// Only transient upstream failures qualify.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<GitHubError> for ConnectorError {
    fn from(err: GitHubError) -> Self {
        if err.is_unauthorized() {
            return ConnectorError::Unauthenticated {
                message: err.to_string(),
            };
        }
        match err {
            GitHubError::Cancelled => ConnectorError::Cancelled,
            other => ConnectorError::Upstream(other),
        }
    }
}

/// Result type for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_upstream_error_maps_to_unauthenticated() {
        let err: ConnectorError = GitHubError::api(401, "Bad credentials").into();
        assert!(matches!(err, ConnectorError::Unauthenticated { .. }));
        assert!(err.to_string().contains("Bad credentials"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn cancelled_upstream_error_maps_to_cancelled() {
        let err: ConnectorError = GitHubError::Cancelled.into();
        assert!(matches!(err, ConnectorError::Cancelled));
    }

    #[test]
    fn transient_upstream_errors_are_retryable() {
        let err: ConnectorError = GitHubError::api(502, "bad gateway").into();
        assert!(err.is_retryable());

        let err: ConnectorError = GitHubError::api(404, "Not Found").into();
        assert!(!err.is_retryable());
        assert!(matches!(err, ConnectorError::Upstream(_)));
    }

    #[test]
    fn unsupported_message_names_operation_and_type() {
        let err = ConnectorError::Unsupported {
            operation: "grant",
            resource_type: ResourceTypeTag::User,
        };
        assert_eq!(err.to_string(), "grant is not supported for user resources");
    }
}
