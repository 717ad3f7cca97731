//! Protection rules: operator allow-list and system-critical paths
//!
//! Two sources of protection, checked on every planning candidate:
//! 1. Critical paths (always enforced, strict path semantics)
//! 2. The allow-list (string-prefix or strict matching, configurable)

use crate::error::{CoreError, Result};
use crate::path::ImagePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How allow-list entries protect paths that are not below them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowMatch {
    /// A path is protected when its string form is a prefix of an entry's
    /// string form. Covers path ancestors, and also lookalike siblings such
    /// as `/usr/lib` for an entry `/usr/lib64`.
    #[default]
    StringPrefix,
    /// Only path ancestors of an entry are protected
    Strict,
}

/// What a rule does to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Path may be deleted
    None,
    /// Path itself must stay, its children are judged on their own
    Node,
    /// Path and everything below it must stay
    Subtree,
}

/// Operator-supplied paths that must never be deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: BTreeSet<ImagePath>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one path per line; blank lines and `#` comments are ignored
    pub fn from_lines(text: &str) -> Result<Self> {
        let mut list = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            list.insert(line.parse()?);
        }
        Ok(list)
    }

    pub fn insert(&mut self, path: ImagePath) {
        self.entries.insert(path);
    }

    pub fn contains(&self, path: &ImagePath) -> bool {
        self.entries.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImagePath> {
        self.entries.iter()
    }
}

impl FromIterator<ImagePath> for AllowList {
    fn from_iter<I: IntoIterator<Item = ImagePath>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<ImagePath> for AllowList {
    fn extend<I: IntoIterator<Item = ImagePath>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

/// Parse configured critical path strings
pub fn parse_critical_paths<S: AsRef<str>>(raw: &[S]) -> Result<Vec<ImagePath>> {
    raw.iter()
        .map(|s| {
            ImagePath::parse(s.as_ref()).ok_or_else(|| CoreError::NotAbsolute(s.as_ref().into()))
        })
        .collect()
}

/// Combined protection rules consulted by the planner
pub struct ProtectionRules {
    critical: Vec<ImagePath>,
    /// Allow-list entries with their rendered string form
    allow: Vec<(ImagePath, String)>,
    mode: AllowMatch,
}

impl ProtectionRules {
    pub fn new(critical: &[ImagePath], allow: &AllowList, mode: AllowMatch) -> Self {
        Self {
            critical: critical.to_vec(),
            allow: allow.iter().map(|p| (p.clone(), p.to_string())).collect(),
            mode,
        }
    }

    /// Check a path against all rules
    pub fn check(&self, path: &ImagePath) -> Protection {
        let mut result = Protection::None;

        // 1. Critical paths (strict semantics regardless of mode)
        for critical in &self.critical {
            if path.starts_with(critical) {
                return Protection::Subtree;
            }
            if path.is_ancestor_of(critical) {
                result = Protection::Node;
            }
        }

        // 2. Allow-list
        let mut rendered: Option<String> = None;
        for (entry, entry_str) in &self.allow {
            if path.starts_with(entry) {
                return Protection::Subtree;
            }
            if result == Protection::Node {
                continue;
            }
            let node_only = match self.mode {
                AllowMatch::Strict => path.is_ancestor_of(entry),
                AllowMatch::StringPrefix => {
                    let path_str = rendered.get_or_insert_with(|| path.to_string());
                    entry_str.starts_with(path_str.as_str())
                }
            };
            if node_only {
                result = Protection::Node;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ImagePath {
        ImagePath::parse(s).unwrap()
    }

    fn rules(allow: &[&str], mode: AllowMatch) -> ProtectionRules {
        let list: AllowList = allow.iter().map(|s| p(s)).collect();
        ProtectionRules::new(&[p("/proc")], &list, mode)
    }

    #[test]
    fn test_critical_paths_always_enforced() {
        let rules = rules(&[], AllowMatch::Strict);
        assert_eq!(rules.check(&p("/proc")), Protection::Subtree);
        assert_eq!(rules.check(&p("/proc/self/maps")), Protection::Subtree);
        assert_eq!(rules.check(&ImagePath::root()), Protection::Node);
        assert_eq!(rules.check(&p("/procfs")), Protection::None);
    }

    #[test]
    fn test_allow_entry_protects_subtree_and_ancestors() {
        for mode in [AllowMatch::Strict, AllowMatch::StringPrefix] {
            let rules = rules(&["/usr/lib/ssl"], mode);
            assert_eq!(rules.check(&p("/usr/lib/ssl")), Protection::Subtree);
            assert_eq!(rules.check(&p("/usr/lib/ssl/certs")), Protection::Subtree);
            assert_eq!(rules.check(&p("/usr/lib")), Protection::Node);
            assert_eq!(rules.check(&p("/usr")), Protection::Node);
            assert_eq!(rules.check(&p("/usr/share")), Protection::None);
        }
    }

    #[test]
    fn test_string_prefix_protects_lookalike_sibling() {
        let prefix = rules(&["/usr/lib64"], AllowMatch::StringPrefix);
        assert_eq!(prefix.check(&p("/usr/lib")), Protection::Node);
        assert_eq!(prefix.check(&p("/usr/lib/x")), Protection::None);

        let strict = rules(&["/usr/lib64"], AllowMatch::Strict);
        assert_eq!(strict.check(&p("/usr/lib")), Protection::None);
    }

    #[test]
    fn test_from_lines() {
        let list = AllowList::from_lines("# keep these\n/etc/ssl\n\n  /usr/local/bin  \n").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&p("/usr/local/bin")));

        let err = AllowList::from_lines("/ok\nrelative/path\n").unwrap_err();
        assert_eq!(err, CoreError::NotAbsolute("relative/path".to_string()));
    }

    #[test]
    fn test_allow_match_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: AllowMatch,
        }
        let w: Wrapper = toml::from_str("mode = \"strict\"").unwrap();
        assert_eq!(w.mode, AllowMatch::Strict);
        let w: Wrapper = toml::from_str("mode = \"string-prefix\"").unwrap();
        assert_eq!(w.mode, AllowMatch::StringPrefix);
    }
}
