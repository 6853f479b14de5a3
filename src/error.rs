//! Error types for pool operations
use std::thread::ThreadId;
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Failures that abort a pool operation.
///
/// Instance-level problems (double release, panicking hooks, abandoned
/// instances) are logged instead and never show up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was configured incorrectly
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// An owner-only operation was called from another thread
    #[error("`{operation}` must run on the owning thread {owner:?}, called from {current:?}")]
    ThreadViolation {
        /// The rejected operation
        operation: &'static str,
        /// The pool's owning thread
        owner: ThreadId,
        /// The calling thread
        current: ThreadId,
    },
}

impl PoolError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        PoolError::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` for thread violations
    pub fn is_thread_violation(&self) -> bool {
        matches!(self, PoolError::ThreadViolation { .. })
    }
}
