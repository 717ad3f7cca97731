//! Deletion planning

use crate::allow::{parse_critical_paths, AllowList, AllowMatch, ProtectionRules};
use crate::error::{CoreError, Result};
use crate::path::ImagePath;
use crate::tree::PathTrie;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Paths never planned, nor any of their ancestors or descendants
    /// (default: /proc, /sys, /dev)
    pub critical_paths: Vec<ImagePath>,
    /// Allow-list matching mode (default: string-prefix)
    pub allow_match: AllowMatch,
    /// Warn when the plan covers at least this share of the inventory (default: 0.9)
    pub warn_fraction: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            critical_paths: parse_critical_paths(&["/proc", "/sys", "/dev"])
                .unwrap_or_default(),
            allow_match: AllowMatch::default(),
            warn_fraction: 0.9,
        }
    }
}

impl PlannerConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.warn_fraction > 0.0 && self.warn_fraction <= 1.0) {
            return Err(CoreError::Config(format!(
                "warn_fraction must be in (0, 1], got {}",
                self.warn_fraction
            )));
        }
        Ok(())
    }
}

/// Sorted antichain of paths to remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    paths: Vec<ImagePath>,
}

impl DeletionPlan {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImagePath> {
        self.paths.iter()
    }

    pub fn contains(&self, path: &ImagePath) -> bool {
        self.paths.binary_search(path).is_ok()
    }

    /// True when `path` would be removed by executing the plan
    pub fn covers(&self, path: &ImagePath) -> bool {
        // The covering entry, if any, is the greatest entry not after `path`
        let idx = self.paths.partition_point(|entry| entry <= path);
        idx > 0 && path.starts_with(&self.paths[idx - 1])
    }
}

impl<'a> IntoIterator for &'a DeletionPlan {
    type Item = &'a ImagePath;
    type IntoIter = std::slice::Iter<'a, ImagePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Safety concerns about a plan; never block it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    /// The filesystem root itself is planned
    RootPlanned,
    /// Nothing was marked as used
    EmptyMustKeep,
    /// The plan removes a large share of the inventory
    LargeFraction { covered: usize, inventory: usize },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::RootPlanned => write!(f, "plan removes the filesystem root"),
            PlanWarning::EmptyMustKeep => {
                write!(f, "no used paths were found, everything is deletable")
            }
            PlanWarning::LargeFraction { covered, inventory } => write!(
                f,
                "plan removes {} of {} inventory paths ({:.1}%)",
                covered,
                inventory,
                *covered as f64 * 100.0 / *inventory as f64
            ),
        }
    }
}

/// Result of a planning run
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub plan: DeletionPlan,
    /// Inventory paths removed by the plan
    pub covered: usize,
    pub inventory_size: usize,
    pub must_keep_size: usize,
    pub warnings: Vec<PlanWarning>,
}

/// Computes deletion plans
pub struct DeletionPlanner {
    config: PlannerConfig,
}

impl DeletionPlanner {
    /// Create a planner with the given configuration
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Compute the topmost paths whose removal deletes every unused
    /// inventory path
    ///
    /// `must_keep` may be a full closure set or its frontier; both give the
    /// same plan. Allow-list and critical-path protection is applied while
    /// choosing deletable nodes, so an ancestor of a protected path stays
    /// while its unrelated children are still removed.
    pub fn plan<'a, I, K>(&self, inventory: I, must_keep: K, allow: &AllowList) -> PlanReport
    where
        I: IntoIterator<Item = &'a ImagePath>,
        K: IntoIterator<Item = &'a ImagePath>,
    {
        let mut trie = PathTrie::new();
        let mut inventory_size = 0;
        for path in inventory {
            trie.add_inventory(path);
            inventory_size += 1;
        }
        let mut must_keep_size = 0;
        for path in must_keep {
            trie.add_keep(path);
            must_keep_size += 1;
        }
        debug!(nodes = trie.len(), "built path trie");

        let rules = ProtectionRules::new(
            &self.config.critical_paths,
            allow,
            self.config.allow_match,
        );
        let found = trie.deletable_roots(&rules);
        let plan = DeletionPlan { paths: found.roots };

        let mut warnings = Vec::new();
        if plan.contains(&ImagePath::root()) {
            warnings.push(PlanWarning::RootPlanned);
        }
        if must_keep_size == 0 && inventory_size > 0 {
            warnings.push(PlanWarning::EmptyMustKeep);
        }
        if inventory_size > 0
            && found.covered as f64 >= self.config.warn_fraction * inventory_size as f64
        {
            warnings.push(PlanWarning::LargeFraction {
                covered: found.covered,
                inventory: inventory_size,
            });
        }
        for warning in &warnings {
            debug!(%warning, "plan warning");
        }

        info!(
            plan = plan.len(),
            covered = found.covered,
            inventory = inventory_size,
            "computed deletion plan"
        );

        PlanReport {
            plan,
            covered: found.covered,
            inventory_size,
            must_keep_size,
            warnings,
        }
    }
}
