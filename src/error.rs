//! Error types for the TTL store and its consumers
//!
//! Provides unified error handling using thiserror, plus a closed registry of
//! error reasons exposed over HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Reason Registry ==
/// Stable, machine-readable error reasons.
///
/// The set is closed: adding a reason means adding a variant here and to
/// [`Reason::ALL`]. Code uniqueness is checked at compile time below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    NotFound,
    Deserialization,
    BadRequest,
    TooManyRequests,
    Server,
}

impl Reason {
    /// Every reason, in declaration order.
    pub const ALL: [Reason; 5] = [
        Reason::NotFound,
        Reason::Deserialization,
        Reason::BadRequest,
        Reason::TooManyRequests,
        Reason::Server,
    ];

    /// Code sent to clients in the `reason` field.
    pub const fn code(self) -> &'static str {
        match self {
            Reason::NotFound => "ErrNotFound",
            Reason::Deserialization => "ErrJSON",
            Reason::BadRequest => "ErrBadRequest",
            Reason::TooManyRequests => "ErrTooManyRequests",
            Reason::Server => "ErrServer",
        }
    }

    /// Default human-readable message.
    pub const fn message(self) -> &'static str {
        match self {
            Reason::NotFound => "resource not found",
            Reason::Deserialization => "JSON encoding or decoding failed",
            Reason::BadRequest => "invalid request parameters",
            Reason::TooManyRequests => "request rate too high",
            Reason::Server => "internal server error",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            Reason::NotFound => StatusCode::NOT_FOUND,
            Reason::Deserialization => StatusCode::UNPROCESSABLE_ENTITY,
            Reason::BadRequest => StatusCode::BAD_REQUEST,
            Reason::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Reason::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn reason_codes_unique() -> bool {
    let mut i = 0;
    while i < Reason::ALL.len() {
        let mut j = i + 1;
        while j < Reason::ALL.len() {
            if str_eq(Reason::ALL[i].code(), Reason::ALL[j].code()) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(reason_codes_unique(), "duplicate error reason code");

// == Cache Error Enum ==
/// Unified error type for the store, cache and HTTP layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent or its entry has expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The stored value could not be recovered as the requested type
    #[error("Cannot decode cached value for {key}: {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client exceeded its rate limit
    #[error("Too many requests from {0}")]
    TooManyRequests(String),

    /// A background sweeper was requested outside a Tokio runtime
    #[error("Fixed-interval sweep requires a running Tokio runtime")]
    MissingRuntime,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// The registry reason reported for this error.
    pub fn reason(&self) -> Reason {
        match self {
            CacheError::NotFound(_) => Reason::NotFound,
            CacheError::Deserialization { .. } => Reason::Deserialization,
            CacheError::InvalidRequest(_) => Reason::BadRequest,
            CacheError::TooManyRequests(_) => Reason::TooManyRequests,
            CacheError::MissingRuntime | CacheError::Internal(_) => Reason::Server,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let reason = self.reason();

        let body = Json(json!({
            "reason": reason.code(),
            "message": reason.message(),
            "error": self.to_string(),
        }));

        (reason.status(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reason_codes_are_unique() {
        let codes: HashSet<_> = Reason::ALL.iter().map(|r| r.code()).collect();
        assert_eq!(codes.len(), Reason::ALL.len());
        assert!(reason_codes_unique());
    }

    #[test]
    fn test_error_reason_mapping() {
        assert_eq!(CacheError::NotFound("k".into()).reason(), Reason::NotFound);
        assert_eq!(
            CacheError::TooManyRequests("1.2.3.4".into()).reason(),
            Reason::TooManyRequests
        );
        assert_eq!(CacheError::MissingRuntime.reason(), Reason::Server);

        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = CacheError::Deserialization {
            key: "k".into(),
            source,
        };
        assert_eq!(err.reason(), Reason::Deserialization);
        assert!(err.to_string().contains("k"));
    }

    #[test]
    fn test_into_response_status() {
        let response = CacheError::NotFound("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = CacheError::TooManyRequests("client".into()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = CacheError::InvalidRequest("bad key".into()).into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["reason"], "ErrBadRequest");
        assert_eq!(json["message"], Reason::BadRequest.message());
        assert_eq!(json["error"], "Invalid request: bad key");
    }

    #[test]
    fn test_str_eq() {
        assert!(str_eq("ErrJSON", "ErrJSON"));
        assert!(!str_eq("ErrJSON", "ErrJSO"));
        assert!(!str_eq("ErrA", "ErrB"));
    }
}
