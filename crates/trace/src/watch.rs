//! Filesystem-watch event logs (`directory,flags,filename` CSV)
//!
//! Events are collected from the host, outside the container's mount
//! namespace, so every directory carries the host-side mount point of the
//! image root. A [`MountPrefix`] removes it before paths are compared.

use crate::error::TraceError;
use crate::split::split_csv;
use crate::{LineParser, TraceStats};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trim_core::{ImagePath, UsageRecord};

/// Host mount point of the traced root, `*` matching any one segment
///
/// e.g. `/home/u/.local/share/containers/storage/overlay/*/merged`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MountPrefix {
    segments: Vec<String>,
}

impl MountPrefix {
    /// Number of leading segments removed
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Re-root `path` below the prefix, `None` if it lies elsewhere
    pub fn strip(&self, path: &ImagePath) -> Option<ImagePath> {
        if path.depth() < self.segments.len() {
            return None;
        }
        let matches = self
            .segments
            .iter()
            .zip(path.segments())
            .all(|(pattern, segment)| pattern == "*" || pattern == segment);
        matches.then(|| path.strip_leading(self.segments.len()))
    }
}

impl FromStr for MountPrefix {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = ImagePath::parse(s.trim())
            .ok_or_else(|| TraceError::InvalidMountPrefix(s.to_string()))?;
        Ok(Self {
            segments: path.segments().map(str::to_string).collect(),
        })
    }
}

impl TryFrom<String> for MountPrefix {
    type Error = TraceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MountPrefix> for String {
    fn from(prefix: MountPrefix) -> Self {
        prefix.to_string()
    }
}

impl fmt::Display for MountPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MountPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MountPrefix({})", self)
    }
}

/// True if the flag column carries an `ISDIR` token
///
/// Tokens may be joined with `|`, `,` or any other non-word character.
fn has_isdir_flag(flags: &str) -> bool {
    flags
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == "ISDIR")
}

/// Line parser for watch-event logs
#[derive(Debug, Clone, Default)]
pub struct WatchParser {
    pub mount_prefix: Option<MountPrefix>,
}

impl LineParser for WatchParser {
    fn parse_line(&self, line: &str, out: &mut Vec<UsageRecord>, stats: &mut TraceStats) {
        let fields = split_csv(line);
        if fields.len() < 3 {
            stats.skipped_lines += 1;
            return;
        }

        let Some(directory) = ImagePath::parse(&fields[0]) else {
            stats.skipped_lines += 1;
            return;
        };
        // Unquoted commas in a file name produce extra fields
        let path = directory.join(&fields[2..].join(","));

        let path = match &self.mount_prefix {
            Some(prefix) => match prefix.strip(&path) {
                Some(stripped) => stripped,
                None => {
                    stats.outside_mount += 1;
                    return;
                }
            },
            None => path,
        };

        out.push(UsageRecord {
            path,
            is_dir: has_isdir_flag(&fields[1]),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/home/u/.local/share/containers/storage/overlay/*/merged";

    fn parse(parser: &WatchParser, line: &str) -> (Vec<UsageRecord>, TraceStats) {
        let mut out = Vec::new();
        let mut stats = TraceStats::default();
        parser.parse_line(line, &mut out, &mut stats);
        (out, stats)
    }

    fn with_prefix() -> WatchParser {
        WatchParser {
            mount_prefix: Some(PREFIX.parse().unwrap()),
        }
    }

    #[test]
    fn test_prefix_stripped_and_isdir() {
        let line = "/home/u/.local/share/containers/storage/overlay/4f2a/merged/usr/lib/,OPEN|ISDIR,python3";
        let (out, _) = parse(&with_prefix(), line);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "/usr/lib/python3");
        assert!(out[0].is_dir);
    }

    #[test]
    fn test_quoted_csv_flags() {
        let line = r#""/home/u/.local/share/containers/storage/overlay/9c/merged/etc/","CLOSE_NOWRITE,CLOSE","hosts""#;
        let (out, _) = parse(&with_prefix(), line);
        assert_eq!(out[0].path.to_string(), "/etc/hosts");
        assert!(!out[0].is_dir);
    }

    #[test]
    fn test_empty_filename_is_directory_itself() {
        let line = "/home/u/.local/share/containers/storage/overlay/9c/merged/opt/,OPEN|ISDIR,";
        let (out, _) = parse(&with_prefix(), line);
        assert_eq!(out[0].path.to_string(), "/opt");
    }

    #[test]
    fn test_outside_mount_counted() {
        let (out, stats) = parse(&with_prefix(), "/var/log/,MODIFY,syslog");
        assert!(out.is_empty());
        assert_eq!(stats.outside_mount, 1);
    }

    #[test]
    fn test_without_prefix() {
        let (out, _) = parse(&WatchParser::default(), "/srv/data/,ACCESS,file.bin");
        assert_eq!(out[0].path.to_string(), "/srv/data/file.bin");
    }

    #[test]
    fn test_malformed_lines() {
        let parser = WatchParser::default();
        for line in ["", "just text", "/a,OPEN", "relative/,OPEN,x"] {
            let (out, stats) = parse(&parser, line);
            assert!(out.is_empty(), "{line}");
            assert_eq!(stats.skipped_lines, 1, "{line}");
        }
    }

    #[test]
    fn test_isdir_token_matching() {
        assert!(has_isdir_flag("CREATE|ISDIR"));
        assert!(has_isdir_flag("ISDIR"));
        assert!(has_isdir_flag("OPEN,ISDIR"));
        assert!(!has_isdir_flag("NOTISDIR"));
        assert!(!has_isdir_flag("OPEN"));
    }

    #[test]
    fn test_mount_prefix_parse_and_display() {
        let prefix: MountPrefix = PREFIX.parse().unwrap();
        assert_eq!(prefix.len(), 9);
        assert_eq!(prefix.to_string(), PREFIX);
        assert!(matches!(
            "relative/prefix".parse::<MountPrefix>(),
            Err(TraceError::InvalidMountPrefix(_))
        ));
    }
}
