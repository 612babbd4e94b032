//! Convenience result type alias for SparkUp.

use crate::error::AppError;

/// A specialized `Result` type for SparkUp operations.
pub type AppResult<T> = Result<T, AppError>;
