//! Error types for socialsync
//!
//! Every remote call and local validation failure is converted to `SyncError`.
//! Call sites decide individually whether a failure is surfaced, logged, or
//! swallowed; the only classification that changes behavior is
//! [`SyncError::is_unauthenticated`].

use thiserror::Error;

/// Library-wide error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// The API answered 401
    #[error("Authentication required")]
    Unauthorized,

    /// Any other 4xx answer, with the response body for display
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// 5xx answer
    #[error("Server error ({status})")]
    Server { status: u16 },

    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Attached media could not be turned into an upload
    #[error("Invalid media: {0}")]
    Media(String),

    /// An operation needed the session user before it was loaded
    #[error("No session user loaded")]
    NoSession,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Unauthorized => Some(401),
            SyncError::Rejected { status, .. } | SyncError::Server { status } => Some(*status),
            SyncError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_unauthenticated() {
        assert!(SyncError::Unauthorized.is_unauthenticated());
        assert_eq!(SyncError::Unauthorized.status(), Some(401));
    }

    #[test]
    fn test_other_statuses_are_not_unauthenticated() {
        let rejected = SyncError::Rejected {
            status: 400,
            message: "bad".to_string(),
        };
        assert!(!rejected.is_unauthenticated());
        assert_eq!(rejected.status(), Some(400));
        assert!(!SyncError::Server { status: 503 }.is_unauthenticated());
    }

    #[test]
    fn test_local_errors_have_no_status() {
        assert_eq!(SyncError::NoSession.status(), None);
        assert_eq!(SyncError::Media("x".to_string()).status(), None);
    }
}
