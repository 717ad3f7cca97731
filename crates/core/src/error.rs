//! Error types for the planning core

use thiserror::Error;

/// Errors raised while constructing core values from operator input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A configured path was not absolute
    #[error("not an absolute path: {0:?}")]
    NotAbsolute(String),

    /// Planner configuration is out of range
    #[error("invalid planner configuration: {0}")]
    Config(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
