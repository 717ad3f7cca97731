//! Plain used-path lists, one absolute path per line
//!
//! This is the format `imgtrim paths` writes, so parsed traces from
//! separate sessions can be concatenated and fed back in. A trailing `/`
//! marks a directory record.

use crate::{LineParser, TraceStats};
use trim_core::{ImagePath, UsageRecord};

/// Render a record in path-list form
pub fn format_record(record: &UsageRecord) -> String {
    if record.is_dir && !record.path.is_root() {
        format!("{}/", record.path)
    } else {
        record.path.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathListParser;

impl LineParser for PathListParser {
    fn parse_line(&self, line: &str, out: &mut Vec<UsageRecord>, stats: &mut TraceStats) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match ImagePath::parse(line) {
            Some(path) => out.push(UsageRecord {
                path,
                is_dir: line.ends_with('/'),
            }),
            None => stats.skipped_lines += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_directory_marker() {
        let mut out = Vec::new();
        let mut stats = TraceStats::default();
        for line in ["/usr/lib/", "/etc/hosts", "", "not/absolute"] {
            PathListParser.parse_line(line, &mut out, &mut stats);
        }
        assert_eq!(out.len(), 2);
        assert!(out[0].is_dir);
        assert!(!out[1].is_dir);
        assert_eq!(stats.skipped_lines, 1);

        let rendered: Vec<String> = out.iter().map(format_record).collect();
        assert_eq!(rendered, vec!["/usr/lib/", "/etc/hosts"]);
    }
}
