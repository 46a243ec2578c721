// agent-router-server/src/errors.rs
// ============================================================================
// Module: Handler Error Taxonomy
// Description: Closed set of handler failures and their stable error codes.
// Purpose: Turn handler failures into machine-readable `error_code` values.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Handlers never return ad-hoc error strings. Every failure is a
//! [`HandlerError`] variant, and each variant maps to exactly one
//! [`ErrorCode`]. The dispatcher folds these into `{ok: false, error_code,
//! message}` envelopes, so codes are part of the public wire contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Stable error codes surfaced in tool responses and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A file, record, or resource does not exist.
    FileNotFound,
    /// Access was refused.
    PermissionDenied,
    /// An operation exceeded its time budget.
    Timeout,
    /// An argument had the wrong type or value.
    InvalidInput,
    /// A required argument was absent.
    MissingField,
    /// An index or offset was out of bounds.
    IndexOutOfRange,
    /// A network peer could not be reached.
    ConnectionError,
    /// Generic I/O failure.
    IoError,
    /// Generic runtime failure.
    RuntimeError,
    /// Unclassified failure.
    InternalError,
    /// Tool name is not registered.
    UnknownTool,
    /// Vendor circuit breaker is open.
    CircuitBreakerOpen,
    /// Batch request exceeded the line-item ceiling.
    MaxLineItemsExceeded,
    /// Frozen tool called without a passing handshake.
    ContractMismatch,
    /// Workspace argument names no registered workspace.
    WorkspaceNotFound,
}

impl ErrorCode {
    /// Returns the wire form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Timeout => "TIMEOUT",
            Self::InvalidInput => "INVALID_INPUT",
            Self::MissingField => "MISSING_FIELD",
            Self::IndexOutOfRange => "INDEX_OUT_OF_RANGE",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::IoError => "IO_ERROR",
            Self::RuntimeError => "RUNTIME_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::UnknownTool => "UNKNOWN_TOOL",
            Self::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            Self::MaxLineItemsExceeded => "MAX_LINE_ITEMS_EXCEEDED",
            Self::ContractMismatch => "CONTRACT_MISMATCH",
            Self::WorkspaceNotFound => "WORKSPACE_NOT_FOUND",
        }
    }
}

// ============================================================================
// SECTION: Handler Errors
// ============================================================================

/// Failures raised by tool handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// Resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Access refused.
    #[error("{0}")]
    PermissionDenied(String),
    /// Operation timed out.
    #[error("{0}")]
    Timeout(String),
    /// Argument had the wrong type or value.
    #[error("{0}")]
    InvalidInput(String),
    /// Required argument missing.
    #[error("{0}")]
    MissingField(String),
    /// Index or offset out of bounds.
    #[error("{0}")]
    IndexOutOfRange(String),
    /// Peer unreachable.
    #[error("{0}")]
    Connection(String),
    /// Generic I/O failure.
    #[error("{0}")]
    Io(String),
    /// Generic runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Vendor breaker open; no request was made.
    #[error("circuit breaker open for vendor '{vendor}'")]
    CircuitOpen {
        /// Vendor key.
        vendor: String,
    },
    /// Batch too large.
    #[error("batch has {count} line items; maximum is {max}")]
    MaxLineItems {
        /// Submitted lines.
        count: usize,
        /// Allowed lines.
        max: usize,
    },
    /// Unclassified failure.
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// Returns the stable code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::FileNotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::IndexOutOfRange(_) => ErrorCode::IndexOutOfRange,
            Self::Connection(_) => ErrorCode::ConnectionError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Runtime(_) => ErrorCode::RuntimeError,
            Self::CircuitOpen {
                ..
            } => ErrorCode::CircuitBreakerOpen,
            Self::MaxLineItems {
                ..
            } => ErrorCode::MaxLineItemsExceeded,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<io::Error> for HandlerError {
    fn from(error: io::Error) -> Self {
        let message = error.to_string();
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(message),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(message),
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout(message),
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Self::InvalidInput(message),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => Self::Connection(message),
            _ => Self::Io(message),
        }
    }
}

impl From<reqwest::Error> for HandlerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::Connection(error.to_string())
        } else {
            Self::Runtime(error.to_string())
        }
    }
}

// ============================================================================
// SECTION: Argument Decoding
// ============================================================================

/// Decodes tool arguments into a typed request.
///
/// # Errors
///
/// Returns [`HandlerError::MissingField`] when serde reports a missing field
/// and [`HandlerError::InvalidInput`] for every other shape error.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, HandlerError> {
    serde_json::from_value(arguments).map_err(|err| {
        let message = err.to_string();
        if message.starts_with("missing field") {
            HandlerError::MissingField(message)
        } else {
            HandlerError::InvalidInput(message)
        }
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
