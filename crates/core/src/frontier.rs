//! Frontier reduction: keep only the deepest member of each ancestor chain

use crate::closure::ClosureSet;
use crate::path::ImagePath;
use crate::record::UsageRecord;
use std::collections::BTreeSet;

/// Reduced form of a closure set
///
/// Holds the members of the closure that have no descendant in it. For an
/// ancestor-closed input, re-closing the frontier yields the input set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    paths: BTreeSet<ImagePath>,
}

impl Frontier {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &ImagePath) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImagePath> {
        self.paths.iter()
    }

    /// Expand back into an ancestor-closed set, treating members as directories
    pub fn reclose(&self) -> ClosureSet {
        self.paths.iter().cloned().map(UsageRecord::dir).collect()
    }
}

impl<'a> IntoIterator for &'a Frontier {
    type Item = &'a ImagePath;
    type IntoIter = std::collections::btree_set::Iter<'a, ImagePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Collapse a closure set into its frontier
///
/// Single scan in segment order: a run continues while each next path lies
/// below the retained one, and the retained path is replaced by the deeper
/// one. When the run breaks the retained path is emitted.
pub fn reduce(closure: &ClosureSet) -> Frontier {
    reduce_sorted(closure.as_set().iter())
}

fn reduce_sorted<'a, I>(sorted: I) -> Frontier
where
    I: IntoIterator<Item = &'a ImagePath>,
{
    let mut paths = BTreeSet::new();
    let mut retained: Option<&ImagePath> = None;

    for current in sorted {
        retained = match retained {
            Some(kept) if kept.is_ancestor_of(current) => Some(current),
            Some(kept) => {
                paths.insert(kept.clone());
                Some(current)
            }
            None => Some(current),
        };
    }
    if let Some(kept) = retained {
        paths.insert(kept.clone());
    }

    tracing::debug!(frontier = paths.len(), "reduced closure");
    Frontier { paths }
}
