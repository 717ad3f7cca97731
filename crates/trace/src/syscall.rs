//! Syscall tracer logs (`name(args) = result`)

use crate::split::split_args;
use crate::{LineParser, TraceStats};
use trim_core::{ImagePath, UsageRecord};

/// One call line after argument extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyscallLine<'a> {
    /// Result did not start with `-1`
    pub succeeded: bool,
    /// Quoted arguments with quotes and truncation markers removed
    pub paths: Vec<&'a str>,
}

/// Extract the path candidates of one trace line
///
/// Returns `None` for lines that are not complete calls: signal and exit
/// markers, unfinished or resumed calls, truncated lines.
pub fn parse_line(line: &str) -> Option<SyscallLine<'_>> {
    // Split on the last separator so nested parentheses in args survive
    let (call, result) = line.rsplit_once(") = ")?;
    let (_name, args) = call.split_once('(')?;

    let succeeded = !result.trim().starts_with("-1");
    let paths = split_args(args).into_iter().filter_map(quoted_path).collect();

    Some(SyscallLine { succeeded, paths })
}

/// Unquote a string argument, tolerating tracer truncation
fn quoted_path(arg: &str) -> Option<&str> {
    let value = arg.strip_prefix('"')?;
    // Missing closing quote means the string itself was cut short
    let value = value.strip_suffix('"').unwrap_or(value);
    // A cut `"prefix"...` keeps its inner quote as a trailing segment, so
    // every real component of the prefix survives as an ancestor
    let value = value.strip_suffix("...").unwrap_or(value);
    (!value.is_empty()).then_some(value)
}

/// Line parser for syscall traces
#[derive(Debug, Clone, Default)]
pub struct SyscallParser {
    /// Mark every path as a directory; only valid when the tracing
    /// workflow guarantees it (e.g. traces filtered to directory calls)
    pub assume_directories: bool,
}

impl LineParser for SyscallParser {
    fn parse_line(&self, line: &str, out: &mut Vec<UsageRecord>, stats: &mut TraceStats) {
        let Some(call) = parse_line(line) else {
            stats.skipped_lines += 1;
            return;
        };

        if !call.succeeded {
            // A failed call proves nothing about usage
            stats.failed_calls += 1;
            return;
        }

        for raw in call.paths {
            match ImagePath::parse(raw) {
                Some(path) => out.push(UsageRecord {
                    path,
                    is_dir: self.assume_directories,
                }),
                None => stats.discarded_paths += 1,
            }
        }
    }
}
