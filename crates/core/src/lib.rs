//! Planning core for trimming container images
//!
//! This crate provides:
//! - Segment-based image paths
//! - Ancestor closure of used paths and its frontier reduction
//! - Allow-list and critical-path protection rules
//! - A trie-backed deletion planner

pub mod allow;
pub mod closure;
pub mod error;
pub mod frontier;
pub mod inventory;
pub mod path;
pub mod planner;
pub mod record;
pub mod tree;

// Re-exports
pub use allow::{AllowList, AllowMatch, Protection, ProtectionRules};
pub use closure::ClosureSet;
pub use error::{CoreError, Result};
pub use frontier::{reduce, Frontier};
pub use inventory::Inventory;
pub use path::ImagePath;
pub use planner::{DeletionPlan, DeletionPlanner, PlanReport, PlanWarning, PlannerConfig};
pub use record::UsageRecord;
pub use tree::PathTrie;
