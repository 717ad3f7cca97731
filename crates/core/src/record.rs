//! Usage records produced by trace parsing

use crate::path::ImagePath;

/// A single observed use of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageRecord {
    /// Path that was accessed
    pub path: ImagePath,
    /// Whether the path must itself be preserved as a directory
    pub is_dir: bool,
}

impl UsageRecord {
    /// Record for a plain file (only its ancestors are preserved)
    pub fn file(path: ImagePath) -> Self {
        Self { path, is_dir: false }
    }

    /// Record for a directory (the path itself is preserved too)
    pub fn dir(path: ImagePath) -> Self {
        Self { path, is_dir: true }
    }
}
