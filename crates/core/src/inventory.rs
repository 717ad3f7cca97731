//! Snapshot of every path present in the image

use crate::path::ImagePath;
use std::collections::BTreeSet;

/// Set of paths that exist on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    paths: BTreeSet<ImagePath>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: ImagePath) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &ImagePath) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImagePath> {
        self.paths.iter()
    }
}

impl FromIterator<ImagePath> for Inventory {
    fn from_iter<I: IntoIterator<Item = ImagePath>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl Extend<ImagePath> for Inventory {
    fn extend<I: IntoIterator<Item = ImagePath>>(&mut self, iter: I) {
        self.paths.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a ImagePath;
    type IntoIter = std::collections::btree_set::Iter<'a, ImagePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}
