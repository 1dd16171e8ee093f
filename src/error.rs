//! Error taxonomy for console API operations
//!
//! Validation errors are raised before any I/O. Transient transport failures
//! are retried inside the search page fetcher and only escape as
//! [`ConsoleError::RetriesExhausted`]. Domain rejections (insufficient funds,
//! rejected orders, ...) propagate unmodified.

use serde_json::Value;
use std::time::Duration;

use crate::retry::FailureKind;

/// Error code the API uses when it has nothing more specific to say
pub const DEFAULT_ERROR_CODE: &str = "GENERAL_API_ERROR";
/// Expired or malformed access token
pub const INVALID_TOKEN_ERROR_CODE: &str = "INVALID_TOKEN";
/// Order can no longer be downloaded
pub const ORDER_EXPIRED_ERROR_CODE: &str = "ORDER_EXPIRED";
/// Caller has no access to the requested collection
pub const COLLECTION_ACCESS_DENIED_ERROR_CODE: &str = "COLLECTION_ACCESS_DENIED";
/// Caller may not perform the requested action
pub const NOT_AUTHORIZED_ERROR_CODE: &str = "NOT_AUTHORIZED";

/// Message fragments mapped to codes when the API only reports the generic code
const ERROR_CODES_BY_MESSAGE_SNIP: &[(&str, &str)] = &[
    ("order expired", ORDER_EXPIRED_ERROR_CODE),
    (
        "not permitted to access any of the collection",
        COLLECTION_ACCESS_DENIED_ERROR_CODE,
    ),
    ("not authorized to perform", NOT_AUTHORIZED_ERROR_CODE),
];

/// Classification of transport-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Request or connect timeout
    Timeout,
    /// Connection refused, DNS failure and similar
    Connect,
    /// Anything else reqwest reports before a status is available
    Other,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connection failed",
            NetworkErrorKind::Other => "network error",
        };
        write!(f, "{s}")
    }
}

/// Console client errors
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Caller-fixable input problem, detected before any network call
    #[error("validation error: {0}")]
    Validation(String),

    /// Identifier resolution found no matching items
    #[error("no valid STAC ids: {0}")]
    NoValidIdentifiers(String),

    /// Order review denied; carries the server's reason
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Order creation rejected by the server
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Operation needs a completed tasking request
    #[error("task not complete: {0}")]
    TaskNotComplete(String),

    /// Credentials were refused or the token is invalid
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Caller is not allowed to perform the action
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Order has expired
    #[error("order expired: {0}")]
    OrderExpired(String),

    /// Caller has no access to the collection
    #[error("collection access denied: {0}")]
    CollectionAccessDenied(String),

    /// Structured API error without a dedicated variant
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// API error code
        code: String,
        /// Human readable message
        message: String,
    },

    /// Non-success HTTP status without a structured error body
    #[error("HTTP error {status}: {message}")]
    Http {
        /// HTTP status
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Transport failure before a response was received
    #[error("{kind}: {message}")]
    Network {
        /// Failure classification
        kind: NetworkErrorKind,
        /// Underlying error text
        message: String,
    },

    /// Response could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Transient failures persisted past the retry budget
    #[error("giving up after {attempts} attempts ({waited:?} backoff): {last}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: usize,
        /// Total time spent sleeping between attempts
        waited: Duration,
        /// Last transient error observed
        last: Box<ConsoleError>,
    },

    /// Server kept returning next-page links past the iteration ceiling
    #[error("search did not terminate after {0} pages")]
    PaginationExceeded(usize),

    /// Shutdown requested while waiting
    #[error("operation cancelled")]
    Cancelled,

    /// Local file system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for console operations
pub type ConsoleResult<T> = Result<T, ConsoleError>;

impl ConsoleError {
    /// Classify the error for retry decisions and user messaging
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ConsoleError::Network { kind, .. } => match kind {
                NetworkErrorKind::Timeout => FailureKind::NetworkTimeout,
                NetworkErrorKind::Connect => FailureKind::NetworkOffline,
                NetworkErrorKind::Other => FailureKind::NetworkGeneric,
            },
            ConsoleError::Http { status, .. } | ConsoleError::Api { status, .. } => {
                FailureKind::from_status(*status)
            }
            ConsoleError::Authentication(_) => FailureKind::AuthFailed(401),
            ConsoleError::Authorization(_) | ConsoleError::CollectionAccessDenied(_) => {
                FailureKind::AuthFailed(403)
            }
            ConsoleError::RetriesExhausted { last, .. } => last.failure_kind(),
            ConsoleError::Validation(_) => FailureKind::InvalidRequest,
            _ => FailureKind::Domain,
        }
    }

    /// Whether the error is worth retrying
    pub fn is_transient(&self) -> bool {
        !matches!(self, ConsoleError::RetriesExhausted { .. }) && self.failure_kind().is_retryable()
    }

    /// Build an error from a reqwest transport failure
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else {
            NetworkErrorKind::Other
        };
        ConsoleError::Network {
            kind,
            message: err.to_string(),
        }
    }

    /// Translate a non-success response body into a typed error
    ///
    /// Accepts `{"error": {...}}` envelopes as well as flat error objects. When
    /// the body carries the generic code, well-known message fragments select a
    /// more specific variant. 429 and 5xx statuses always map to
    /// [`ConsoleError::Http`] so they stay retryable.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        if status == 429 || (500..600).contains(&status) {
            return ConsoleError::Http {
                status,
                message: body.to_string(),
            };
        }

        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = match parsed {
            Some(Value::Object(mut map)) => match map.remove("error") {
                Some(inner @ Value::Object(_)) => inner,
                Some(other) => {
                    map.insert("error".to_string(), other);
                    Value::Object(map)
                }
                None => Value::Object(map),
            },
            _ => {
                return ConsoleError::Http {
                    status,
                    message: body.to_string(),
                }
            }
        };

        let message = error
            .get("message")
            .or_else(|| error.get("Message"))
            .and_then(Value::as_str)
            .unwrap_or(body)
            .to_string();
        let mut code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ERROR_CODE)
            .to_string();

        if code == DEFAULT_ERROR_CODE {
            let lowered = message.to_lowercase();
            if let Some((_, mapped)) = ERROR_CODES_BY_MESSAGE_SNIP
                .iter()
                .find(|(snip, _)| lowered.contains(snip))
            {
                code = (*mapped).to_string();
            }
        }

        match code.as_str() {
            INVALID_TOKEN_ERROR_CODE => ConsoleError::Authentication(message),
            ORDER_EXPIRED_ERROR_CODE => ConsoleError::OrderExpired(message),
            COLLECTION_ACCESS_DENIED_ERROR_CODE => ConsoleError::CollectionAccessDenied(message),
            NOT_AUTHORIZED_ERROR_CODE => ConsoleError::Authorization(message),
            _ => ConsoleError::Api {
                status,
                code,
                message,
            },
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Parse(err.to_string())
    }
}
