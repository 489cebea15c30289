//! Unified application error types for the overlay.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The kind decides how a caller reacts:
//! everything except [`ErrorKind::Configuration`] and [`ErrorKind::Internal`]
//! is logged and skipped, never retried.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Credentials were rejected or the auth backend could not be reached.
    Authentication,
    /// The connection registry backend failed or is unreachable.
    StoreUnavailable,
    /// An inbound application payload was malformed.
    Parse,
    /// A Directory or Processing Service call failed.
    BackendCall,
    /// The change feed could not be opened or broke.
    Feed,
    /// The messaging engine refused a publish.
    Engine,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            Self::Parse => write!(f, "PARSE"),
            Self::BackendCall => write!(f, "BACKEND_CALL"),
            Self::Feed => write!(f, "FEED"),
            Self::Engine => write!(f, "ENGINE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout the overlay.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a store-unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreUnavailable, message)
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    /// Create a backend call error.
    pub fn backend_call(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendCall, message)
    }

    /// Create a change feed error.
    pub fn feed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Feed, message)
    }

    /// Create a messaging engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Engine, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the error belongs to the log-and-continue class.
    pub fn is_soft(&self) -> bool {
        !matches!(self.kind, ErrorKind::Configuration | ErrorKind::Internal)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
