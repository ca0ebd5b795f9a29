//! Error types for the blog API client.
//!
//! Every failure the client or the feed store surfaces is a [`BlogError`]. The
//! classifier functions here turn an HTTP status plus a best-effort JSON body
//! into a structured error and decide whether it is worth retrying.

use std::borrow::Cow;

use serde_json::Value;
use thiserror::Error;

/// Errors returned by the blog client.
#[derive(Error, Debug)]
pub enum BlogError {
    /// No response reached us (connect failure, DNS, timeout).
    #[error("Network error: please check your connection and try again ({message})")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The API answered with a non-success status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Symbolic reason: the server's `code`, or `HTTP_<status>`.
        code: String,
        /// Server-declared message, or a generic `HTTP <status> error`.
        message: String,
        /// Raw error payload, when it parsed as JSON.
        details: Option<Value>,
    },

    /// A success response whose body did not have the expected shape.
    #[error("Unexpected response from server: {message}")]
    Decode {
        message: String,
        body_snippet: String,
    },

    /// No signed-in user where one is required.
    #[error("{0}")]
    Unauthenticated(String),

    /// Input rejected locally before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Request body serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for blog client operations.
pub type Result<T> = std::result::Result<T, BlogError>;

/// Closed failure taxonomy used for retry and presentation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    ClientError,
    ServerError,
    RateLimited,
    AuthRequired,
    Forbidden,
    NotFound,
    Decode,
    Config,
}

impl ErrorKind {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::AuthRequired,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::ClientError,
        }
    }

    /// Transient failures: network, 5xx and rate limiting.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::ServerError | ErrorKind::RateLimited
        )
    }
}

impl BlogError {
    /// Build a network-level error from a transport failure.
    pub fn network(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "could not connect to server".to_string()
        } else {
            err.to_string()
        };
        BlogError::Network {
            message,
            source: Some(err),
        }
    }

    /// HTTP status, or `None` when no response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            BlogError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Cow<'_, str> {
        match self {
            BlogError::Network { .. } => Cow::Borrowed("NETWORK_ERROR"),
            BlogError::Api { code, .. } => Cow::Borrowed(code.as_str()),
            BlogError::Decode { .. } => Cow::Borrowed("DECODE_ERROR"),
            BlogError::Unauthenticated(_) => Cow::Borrowed("UNAUTHENTICATED"),
            BlogError::Validation(_) => Cow::Borrowed("VALIDATION_ERROR"),
            BlogError::Config(_) => Cow::Borrowed("CONFIG_ERROR"),
            BlogError::Json(_) => Cow::Borrowed("JSON_ERROR"),
        }
    }

    /// Human-readable message, suitable for direct display.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Raw server error payload, if any.
    pub fn details(&self) -> Option<&Value> {
        match self {
            BlogError::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BlogError::Network { .. } => ErrorKind::Network,
            BlogError::Api { status, .. } => ErrorKind::from_status(*status),
            BlogError::Decode { .. } => ErrorKind::Decode,
            BlogError::Unauthenticated(_) => ErrorKind::AuthRequired,
            BlogError::Validation(_) | BlogError::Json(_) => ErrorKind::ClientError,
            BlogError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// A permanent 4xx failure. Rate limiting (429) is transient and excluded.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status) && status != 429)
    }

    /// User-facing summary of this error.
    pub fn notice(&self) -> ErrorNotice {
        let (title, message, severity) = match self.status() {
            Some(401) => (
                "Authentication Required".to_string(),
                "Please log in again to continue".to_string(),
                Severity::Warning,
            ),
            Some(403) => (
                "Access Denied".to_string(),
                "You don't have permission to perform this action".to_string(),
                Severity::Warning,
            ),
            Some(404) => (
                "Not Found".to_string(),
                "The requested resource was not found".to_string(),
                Severity::Info,
            ),
            Some(429) => (
                "Too Many Requests".to_string(),
                "Please wait a moment before trying again".to_string(),
                Severity::Warning,
            ),
            Some(500) => (
                "Server Error".to_string(),
                "Something went wrong on our end. Please try again later".to_string(),
                Severity::Error,
            ),
            Some(status) if (400..500).contains(&status) => {
                (format!("Error {status}"), self.message(), Severity::Warning)
            }
            Some(status) => (format!("Error {status}"), self.message(), Severity::Error),
            None => match self.kind() {
                ErrorKind::Network => (
                    "Network Error".to_string(),
                    "Please check your internet connection and try again".to_string(),
                    Severity::Warning,
                ),
                ErrorKind::AuthRequired => (
                    "Authentication Required".to_string(),
                    self.message(),
                    Severity::Warning,
                ),
                _ => ("Error".to_string(), self.message(), Severity::Error),
            },
        };
        let should_retry = severity == Severity::Warning || self.status() == Some(500);
        ErrorNotice {
            title,
            message,
            severity,
            should_retry,
        }
    }
}

/// How prominently a UI should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Title, message and severity for showing an error to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub should_retry: bool,
}

/// Turn a non-success status and its raw body into a classified error.
///
/// The body is parsed as JSON on a best-effort basis; `message` (then `error`)
/// and `code` are taken from it when present.
pub fn classify_response(status: u16, body: &str) -> BlogError {
    let details: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        details
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let message = field("message")
        .or_else(|| field("error"))
        .unwrap_or_else(|| format!("HTTP {status} error"));
    let code = field("code").unwrap_or_else(|| format!("HTTP_{status}"));
    BlogError::Api {
        status,
        code,
        message,
        details,
    }
}
