//! Error types for the pet-to-doctor API client.
//!
//! # Design
//! Failures fall into three families: the exchange never completed
//! (`Transport`, `Timeout`, `Cancelled`), the backend answered with a
//! non-2xx status (`NotFound`, `Http`), or the backend answered 2xx with a
//! body that does not fit the operation's schema (`Envelope`). The
//! remaining variants are raised while building a request, before any I/O.

use thiserror::Error;

/// Errors returned by `PetDoctorClient` and `PetDoctorApi`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, reset, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The per-call deadline elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The call's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {}", http_detail(.message, .body))]
    Http {
        status: u16,
        message: Option<String>,
        body: String,
    },

    /// A 2xx body without a usable `data` field.
    #[error("unexpected response: {0}")]
    Envelope(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// An authenticated operation was built with no credential set.
    #[error("no credential set for authenticated request")]
    MissingCredential,

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// A path parameter that would not survive as its own segment.
    #[error("invalid path parameter: {0:?}")]
    InvalidPathParameter(String),
}

impl ApiError {
    /// The backend could not be reached; typically shown as "offline".
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Timeout)
    }

    /// The credential is missing or was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::MissingCredential | ApiError::Http { status: 401 | 403, .. }
        )
    }

    /// The backend answered, but not in the shape this client expects.
    pub fn is_unexpected_response(&self) -> bool {
        matches!(self, ApiError::Envelope(_))
    }

    /// HTTP status carried by the error, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn http_detail<'a>(message: &'a Option<String>, body: &'a str) -> &'a str {
    message.as_deref().unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_display_prefers_backend_message() {
        let err = ApiError::Http {
            status: 401,
            message: Some("password mismatch".to_string()),
            body: r#"{"message":"password mismatch"}"#.to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401: password mismatch");

        let err = ApiError::Http {
            status: 502,
            message: None,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }

    #[test]
    fn classification_helpers() {
        assert!(ApiError::Timeout.is_network());
        assert!(ApiError::Transport("refused".into()).is_network());
        assert!(!ApiError::NotFound.is_network());

        assert!(ApiError::MissingCredential.is_unauthorized());
        let rejected = ApiError::Http {
            status: 401,
            message: None,
            body: String::new(),
        };
        assert!(rejected.is_unauthorized());
        assert_eq!(rejected.status(), Some(401));

        assert!(ApiError::Envelope("missing data".into()).is_unexpected_response());
        assert_eq!(ApiError::Cancelled.status(), None);
    }
}
