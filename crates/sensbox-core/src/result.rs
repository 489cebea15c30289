//! Convenience result type alias for Sensbox.

use crate::error::AppError;

/// A specialized `Result` type for overlay operations.
pub type AppResult<T> = Result<T, AppError>;
