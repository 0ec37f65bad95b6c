//! Error types for Drive operations.
//!
//! Each error maps to an [`ErrorCategory`] carrying a short description and
//! advice for the operator.

use std::fmt;

/// Result type alias for Drive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Drive errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network failures and unexpected server statuses.
    Network,
    /// Credentials are malformed or were rejected.
    Auth,
    /// The file or folder does not exist (or is not visible to the caller).
    NotFound,
    /// The caller lacks permission, or a rate limit was hit.
    Permission,
    /// The API returned something we could not decode.
    Format,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication failed",
            Self::NotFound => "File or folder not found",
            Self::Permission => "Permission denied",
            Self::Format => "Invalid API response",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::Auth => "Check that the service account key is valid and not revoked",
            Self::NotFound => "Verify the folder ids and that they are shared with the service account",
            Self::Permission => "Share the folders with the service account or slow down requests",
            Self::Format => "The Drive API may have changed, check the error details",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during Drive operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service-account key could not be parsed or used.
    #[error("invalid service account key: {0}")]
    InvalidKey(String),

    /// The token endpoint refused the JWT assertion.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    HttpError {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// File not found.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::HttpError {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidKey(_) | Error::TokenExchange(_) => ErrorCategory::Auth,
            Error::HttpError { status, .. } => match status {
                Some(401) => ErrorCategory::Auth,
                Some(403 | 429) => ErrorCategory::Permission,
                Some(404) => ErrorCategory::NotFound,
                _ => ErrorCategory::Network,
            },
            Error::FileNotFound(_) => ErrorCategory::NotFound,
            Error::InvalidResponse(_) => ErrorCategory::Format,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::HttpError {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::HttpError {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidKey(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::Auth.advice().is_empty());
        assert!(!ErrorCategory::NotFound.advice().is_empty());
        assert!(format!("{}", ErrorCategory::Network).contains("Network"));
    }

    #[test]
    fn test_http_status_categories() {
        assert_eq!(Error::http("HTTP 401", Some(401)).category(), ErrorCategory::Auth);
        assert_eq!(
            Error::http("HTTP 403", Some(403)).category(),
            ErrorCategory::Permission
        );
        assert_eq!(
            Error::http("HTTP 429", Some(429)).category(),
            ErrorCategory::Permission
        );
        assert_eq!(Error::http("HTTP 404", Some(404)).category(), ErrorCategory::NotFound);
        assert_eq!(Error::http("HTTP 503", Some(503)).category(), ErrorCategory::Network);
        assert_eq!(Error::http("reset", None).category(), ErrorCategory::Network);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Error::FileNotFound("abc".to_string());
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "file not found: abc");
    }

    #[test]
    fn test_key_errors_are_auth() {
        let err = Error::InvalidKey("missing private_key".to_string());
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(err.to_string().contains("missing private_key"));
    }

    #[test]
    fn test_from_ureq_status_code() {
        let err: Error = ureq::Error::StatusCode(404).into();
        match err {
            Error::HttpError { message, status } => {
                assert_eq!(message, "HTTP 404");
                assert_eq!(status, Some(404));
            }
            _ => panic!("Expected Error::HttpError"),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
