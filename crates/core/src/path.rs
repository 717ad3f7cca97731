//! Segment-based absolute paths inside an image

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Segment storage; most image paths are shallower than 8 levels
type Segments = SmallVec<[Box<str>; 8]>;

/// An absolute, normalized path inside the image filesystem
///
/// Ordering is segment-wise lexicographic, so a path always sorts before
/// all of its descendants. The root `/` has no segments.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImagePath {
    segments: Segments,
}

impl ImagePath {
    /// The filesystem root
    pub fn root() -> Self {
        Self {
            segments: SmallVec::new(),
        }
    }

    /// Parse and normalize an absolute path
    ///
    /// Repeated separators and `.` segments are dropped, `..` removes the
    /// previous segment (a no-op at the root). Returns `None` for relative
    /// or empty input.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.starts_with('/') {
            return None;
        }
        let mut path = Self::root();
        path.push_normalized(raw);
        Some(path)
    }

    /// Build a path from already-split segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self::root();
        for segment in segments {
            path.push_normalized(segment.as_ref());
        }
        path
    }

    fn push_normalized(&mut self, raw: &str) {
        for part in raw.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    self.segments.pop();
                }
                segment => self.segments.push(segment.into()),
            }
        }
    }

    /// Append a relative path, normalizing as it goes
    pub fn join(&self, relative: &str) -> Self {
        let mut joined = self.clone();
        joined.push_normalized(relative);
        joined
    }

    /// Descend one level in place (segment must not contain `/`)
    pub(crate) fn push(&mut self, segment: &str) {
        self.segments.push(segment.into());
    }

    /// Ascend one level in place
    pub(crate) fn pop(&mut self) {
        self.segments.pop();
    }

    /// Path segments from the root down
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.segments.iter().map(|s| s.as_ref())
    }

    /// Number of segments (0 for the root)
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_ref())
    }

    /// Parent directory, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(self.prefix(self.depth() - 1))
        }
    }

    /// The ancestor made of the first `len` segments
    fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len].iter().cloned().collect(),
        }
    }

    /// Proper ancestors, nearest first, ending with the root
    pub fn ancestors(&self) -> impl Iterator<Item = ImagePath> + '_ {
        (0..self.depth()).rev().map(move |len| self.prefix(len))
    }

    /// True iff `self`'s segments are a strict prefix of `other`'s
    pub fn is_ancestor_of(&self, other: &ImagePath) -> bool {
        self.depth() < other.depth() && other.segments[..self.depth()] == self.segments[..]
    }

    /// True iff `self` equals `base` or lies below it
    pub fn starts_with(&self, base: &ImagePath) -> bool {
        base == self || base.is_ancestor_of(self)
    }

    /// Drop the first `count` segments, re-rooting the remainder at `/`
    pub fn strip_leading(&self, count: usize) -> Self {
        Self {
            segments: self.segments.iter().skip(count).cloned().collect(),
        }
    }
}

impl fmt::Display for ImagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ImagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImagePath({})", self)
    }
}

impl FromStr for ImagePath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim()).ok_or_else(|| CoreError::NotAbsolute(s.to_string()))
    }
}

impl TryFrom<String> for ImagePath {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImagePath> for String {
    fn from(path: ImagePath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ImagePath {
        ImagePath::parse(s).unwrap()
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(p("/usr//lib/./x").to_string(), "/usr/lib/x");
        assert_eq!(p("/usr/lib/../bin/").to_string(), "/usr/bin");
        assert_eq!(p("/../etc").to_string(), "/etc");
        assert_eq!(p("/").to_string(), "/");
        assert_eq!(p("//").to_string(), "/");
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(ImagePath::parse("etc/passwd").is_none());
        assert!(ImagePath::parse("").is_none());
        assert!(ImagePath::parse("\\177ELF").is_none());
    }

    #[test]
    fn test_ancestry() {
        let a = p("/a");
        let ab = p("/a/b");
        let abc = p("/a/bc");
        assert!(a.is_ancestor_of(&ab));
        assert!(!ab.is_ancestor_of(&ab));
        assert!(!ab.is_ancestor_of(&abc));
        assert!(ImagePath::root().is_ancestor_of(&a));
        assert!(ab.starts_with(&ab));
        assert!(ab.starts_with(&a));
        assert!(!a.starts_with(&ab));
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let got: Vec<String> = p("/a/b/c").ancestors().map(|a| a.to_string()).collect();
        assert_eq!(got, vec!["/a/b", "/a", "/"]);
        assert_eq!(ImagePath::root().ancestors().count(), 0);
    }

    #[test]
    fn test_segment_order_differs_from_string_order() {
        // '-' sorts before '/' as a byte, but segment order compares "a" < "a-b" first
        let mut paths = vec![p("/a-b"), p("/a/z"), p("/a")];
        paths.sort();
        let got: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(got, vec!["/a", "/a/z", "/a-b"]);
    }

    #[test]
    fn test_join_and_strip() {
        let base = p("/host/layer/abc");
        assert_eq!(base.join("usr/lib").to_string(), "/host/layer/abc/usr/lib");
        assert_eq!(base.join("").to_string(), "/host/layer/abc");
        assert_eq!(base.join("usr/lib").strip_leading(3).to_string(), "/usr/lib");
        assert_eq!(base.strip_leading(10), ImagePath::root());
    }

    #[test]
    fn test_from_str_errors() {
        assert!("/etc".parse::<ImagePath>().is_ok());
        assert_eq!(
            "etc".parse::<ImagePath>(),
            Err(CoreError::NotAbsolute("etc".to_string()))
        );
    }
}
