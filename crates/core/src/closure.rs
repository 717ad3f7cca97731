//! Ancestor closure of used paths

use crate::path::ImagePath;
use crate::record::UsageRecord;
use std::collections::BTreeSet;

/// Every path that must survive because it, or something below it, was used
///
/// Directory records contribute themselves; every record contributes all of
/// its proper ancestors except the root, which the planner always protects
/// on its own whenever anything is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureSet {
    paths: BTreeSet<ImagePath>,
}

impl ClosureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the closure of a record stream
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = UsageRecord>,
    {
        let mut closure = Self::new();
        closure.extend(records);
        closure
    }

    /// Add one record
    pub fn insert(&mut self, record: &UsageRecord) {
        if record.is_dir && !record.path.is_root() {
            self.paths.insert(record.path.clone());
        }
        for ancestor in record.path.ancestors() {
            if ancestor.is_root() {
                break;
            }
            // Ancestors of a present path are already present
            if !self.paths.insert(ancestor) {
                break;
            }
        }
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

    /// Members in segment-lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &ImagePath> {
        self.paths.iter()
    }

    pub(crate) fn as_set(&self) -> &BTreeSet<ImagePath> {
        &self.paths
    }
}

impl Extend<UsageRecord> for ClosureSet {
    fn extend<I: IntoIterator<Item = UsageRecord>>(&mut self, records: I) {
        for record in records {
            self.insert(&record);
        }
    }
}

impl FromIterator<UsageRecord> for ClosureSet {
    fn from_iter<I: IntoIterator<Item = UsageRecord>>(records: I) -> Self {
        Self::from_records(records)
    }
}

impl<'a> IntoIterator for &'a ClosureSet {
    type Item = &'a ImagePath;
    type IntoIter = std::collections::btree_set::Iter<'a, ImagePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl IntoIterator for ClosureSet {
    type Item = ImagePath;
    type IntoIter = std::collections::btree_set::IntoIter<ImagePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}
