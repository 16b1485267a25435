//! Error taxonomy shared by the client and the dispatcher.
//!
//! Every failure that crosses the RPC boundary is an [`RpcError`] tagged with one
//! member of the closed [`ErrorKind`] set. The kind fixes the wire code, the default
//! HTTP-style status and whether the client may retry.

use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of error kinds understood by both ends of the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Transport
    NetworkError,
    Timeout,
    ConnectionFailed,

    // Server
    InternalServerError,
    FunctionNotFound,
    InvalidArguments,

    // Encoding
    SerializationError,
    DeserializationError,
    UnsupportedType,

    // Authorization (reserved for collaborators)
    Unauthorized,
    Forbidden,

    // Validation (reserved for function implementations)
    ValidationError,
    MissingParameter,
}

/// Coarse grouping of [`ErrorKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Server,
    Encoding,
    Authorization,
    Validation,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::NetworkError,
        ErrorKind::Timeout,
        ErrorKind::ConnectionFailed,
        ErrorKind::InternalServerError,
        ErrorKind::FunctionNotFound,
        ErrorKind::InvalidArguments,
        ErrorKind::SerializationError,
        ErrorKind::DeserializationError,
        ErrorKind::UnsupportedType,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::ValidationError,
        ErrorKind::MissingParameter,
    ];

    /// Wire code, e.g. `FUNCTION_NOT_FOUND`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::ConnectionFailed => "CONNECTION_FAILED",
            ErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorKind::FunctionNotFound => "FUNCTION_NOT_FOUND",
            ErrorKind::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorKind::SerializationError => "SERIALIZATION_ERROR",
            ErrorKind::DeserializationError => "DESERIALIZATION_ERROR",
            ErrorKind::UnsupportedType => "UNSUPPORTED_TYPE",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::MissingParameter => "MISSING_PARAMETER",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == code)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::NetworkError | ErrorKind::Timeout | ErrorKind::ConnectionFailed => {
                ErrorCategory::Transport
            }
            ErrorKind::InternalServerError
            | ErrorKind::FunctionNotFound
            | ErrorKind::InvalidArguments => ErrorCategory::Server,
            ErrorKind::SerializationError
            | ErrorKind::DeserializationError
            | ErrorKind::UnsupportedType => ErrorCategory::Encoding,
            ErrorKind::Unauthorized | ErrorKind::Forbidden => ErrorCategory::Authorization,
            ErrorKind::ValidationError | ErrorKind::MissingParameter => ErrorCategory::Validation,
        }
    }

    /// Status code used when the error is raised without an explicit one.
    ///
    /// `ConnectionFailed` is 0: no HTTP exchange took place.
    pub fn default_status(&self) -> u16 {
        match self {
            ErrorKind::NetworkError => 502,
            ErrorKind::Timeout => 408,
            ErrorKind::ConnectionFailed => 0,
            ErrorKind::InternalServerError => 500,
            ErrorKind::FunctionNotFound => 404,
            ErrorKind::InvalidArguments => 400,
            ErrorKind::SerializationError => 500,
            ErrorKind::DeserializationError => 400,
            ErrorKind::UnsupportedType => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::ValidationError => 400,
            ErrorKind::MissingParameter => 400,
        }
    }

    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified RPC failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: u16,
    /// Server-side diagnostic (stack/backtrace). Only sent when diagnostics are enabled.
    pub server_diagnostic: Option<String>,
    pub context: Option<Map>,
}

/// Result type alias for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: kind.default_status(),
            server_diagnostic: None,
            context: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.server_diagnostic = Some(diagnostic.into());
        self
    }

    /// Attach one entry of structured context.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionFailed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    pub fn not_found(method: &str) -> Self {
        Self::new(
            ErrorKind::FunctionNotFound,
            format!("Function '{}' not found", method),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArguments, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationError, message)
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeserializationError, message)
    }

    pub fn unsupported_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedType, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorKind::MissingParameter,
            format!("Missing required parameter: {}", name),
        )
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
