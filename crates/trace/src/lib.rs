//! Trace ingestion for imgtrim
//!
//! This crate provides:
//! - Syscall tracer log parsing (`name(args) = result` lines)
//! - Filesystem-watch CSV parsing with host mount-prefix stripping
//! - Plain used-path lists (the `imgtrim paths` output)
//! - Inventory loading from listings or an extracted root filesystem
//!
//! Every trace source is read lazily through [`TraceRecords`]; malformed
//! lines are counted in [`TraceStats`] and never abort ingestion.

pub mod error;
pub mod inventory;
pub mod pathlist;
pub mod split;
pub mod syscall;
pub mod watch;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use trim_core::UsageRecord;

// Re-exports
pub use error::{Result, TraceError};
pub use inventory::{parse_inventory, read_inventory, scan_rootfs, InventoryStats};
pub use pathlist::PathListParser;
pub use syscall::SyscallParser;
pub use watch::{MountPrefix, WatchParser};

/// Turns one line of a trace into zero or more usage records
pub trait LineParser {
    fn parse_line(&self, line: &str, out: &mut Vec<UsageRecord>, stats: &mut TraceStats);
}

/// Counters for one or more trace sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    /// Lines read
    pub lines: u64,
    /// Usage records emitted
    pub records: u64,
    /// Calls whose result was a failure
    pub failed_calls: u64,
    /// Lines that were not parseable records
    pub skipped_lines: u64,
    /// Quoted strings that were not absolute paths
    pub discarded_paths: u64,
    /// Watch events outside the configured mount prefix
    pub outside_mount: u64,
}

impl AddAssign for TraceStats {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.records += other.records;
        self.failed_calls += other.failed_calls;
        self.skipped_lines += other.skipped_lines;
        self.discarded_paths += other.discarded_paths;
        self.outside_mount += other.outside_mount;
    }
}

/// Supported trace formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceFormat {
    /// Syscall tracer output
    Syscall,
    /// `directory,flags,filename` watch events
    Watch,
    /// One absolute path per line
    PathList,
}

impl TraceFormat {
    /// Guess the format from a file extension
    ///
    /// `.csv` is a watch log, `.paths` a path list, anything else a
    /// syscall trace.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => TraceFormat::Watch,
            Some("paths") => TraceFormat::PathList,
            _ => TraceFormat::Syscall,
        }
    }
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraceFormat::Syscall => "syscall",
            TraceFormat::Watch => "watch",
            TraceFormat::PathList => "path-list",
        };
        f.write_str(name)
    }
}

/// Parsing options shared by all sources of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceOptions {
    /// Host mount point stripped from watch-event paths
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_prefix: Option<MountPrefix>,
    /// Treat every syscall path as a directory
    pub assume_directories: bool,
}

/// Parser for any supported format
#[derive(Debug, Clone)]
pub enum FormatParser {
    Syscall(SyscallParser),
    Watch(WatchParser),
    PathList(PathListParser),
}

impl FormatParser {
    pub fn new(format: TraceFormat, options: &TraceOptions) -> Self {
        match format {
            TraceFormat::Syscall => FormatParser::Syscall(SyscallParser {
                assume_directories: options.assume_directories,
            }),
            TraceFormat::Watch => FormatParser::Watch(WatchParser {
                mount_prefix: options.mount_prefix.clone(),
            }),
            TraceFormat::PathList => FormatParser::PathList(PathListParser),
        }
    }
}

impl LineParser for FormatParser {
    fn parse_line(&self, line: &str, out: &mut Vec<UsageRecord>, stats: &mut TraceStats) {
        match self {
            FormatParser::Syscall(p) => p.parse_line(line, out, stats),
            FormatParser::Watch(p) => p.parse_line(line, out, stats),
            FormatParser::PathList(p) => p.parse_line(line, out, stats),
        }
    }
}

/// Lazy record stream over one trace source
///
/// Invalid UTF-8 is decoded lossily. A read error ends the stream; call
/// [`TraceRecords::finish`] to surface it together with the counters.
pub struct TraceRecords<R, P> {
    source: PathBuf,
    lines: io::Split<R>,
    parser: P,
    pending: std::vec::IntoIter<UsageRecord>,
    stats: TraceStats,
    error: Option<io::Error>,
}

impl<R: BufRead, P: LineParser> TraceRecords<R, P> {
    pub fn new(reader: R, parser: P, source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            lines: reader.split(b'\n'),
            parser,
            pending: Vec::new().into_iter(),
            stats: TraceStats::default(),
            error: None,
        }
    }

    /// Counters so far
    pub fn stats(&self) -> &TraceStats {
        &self.stats
    }

    /// Source path this stream reads
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// End the stream, returning its counters or the read error that cut it short
    pub fn finish(self) -> Result<TraceStats> {
        if let Some(source) = self.error {
            return Err(TraceError::io(&self.source, source));
        }
        debug!(
            source = %self.source.display(),
            lines = self.stats.lines,
            records = self.stats.records,
            skipped = self.stats.skipped_lines,
            failed = self.stats.failed_calls,
            "finished trace source"
        );
        Ok(self.stats)
    }
}

impl<R: BufRead, P: LineParser> Iterator for TraceRecords<R, P> {
    type Item = UsageRecord;

    fn next(&mut self) -> Option<UsageRecord> {
        loop {
            if let Some(record) = self.pending.next() {
                self.stats.records += 1;
                return Some(record);
            }
            if self.error.is_some() {
                return None;
            }

            match self.lines.next()? {
                Ok(bytes) => {
                    self.stats.lines += 1;
                    let text = String::from_utf8_lossy(&bytes);
                    let mut out = Vec::new();
                    self.parser
                        .parse_line(text.trim_end_matches('\r'), &mut out, &mut self.stats);
                    self.pending = out.into_iter();
                }
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            }
        }
    }
}

/// Open an input file, mapping a missing file to [`TraceError::NotFound`]
pub fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| TraceError::io(path, e))
}

/// Open a trace file as a lazy record stream
pub fn open_trace(
    path: &Path,
    format: TraceFormat,
    options: &TraceOptions,
) -> Result<TraceRecords<BufReader<File>, FormatParser>> {
    let file = open_input(path)?;
    Ok(TraceRecords::new(
        BufReader::new(file),
        FormatParser::new(format, options),
        path,
    ))
}

/// Read a whole trace file
pub fn read_trace(
    path: &Path,
    format: TraceFormat,
    options: &TraceOptions,
) -> Result<(Vec<UsageRecord>, TraceStats)> {
    let mut records = open_trace(path, format, options)?;
    let collected: Vec<UsageRecord> = records.by_ref().collect();
    let stats = records.finish()?;
    info!(
        source = %path.display(),
        %format,
        records = stats.records,
        skipped = stats.skipped_lines,
        "parsed trace"
    );
    Ok((collected, stats))
}
