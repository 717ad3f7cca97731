//! Print the used paths found in traces
//!
//! The output is a path list: it can be saved and fed back through
//! `--path-list` to merge traces from separate sessions.

use crate::config::AppConfig;
use crate::util;
use crate::TraceArgs;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use trace::pathlist::format_record;
use trim_core::{ImagePath, UsageRecord};

pub async fn run(args: TraceArgs, config: AppConfig) -> Result<()> {
    let sources = args.sources();
    if sources.is_empty() {
        anyhow::bail!("No trace given: pass --strace, --watch, --path-list or --trace");
    }
    let mut options = config.trace.clone();
    if args.mount_prefix.is_some() {
        options.mount_prefix = args.mount_prefix.clone();
    }
    options.assume_directories |= args.assume_dirs;

    let (records, stats) = util::load_traces(sources, &options).await?;

    // One line per path; a directory sighting wins over a file sighting
    let mut used: BTreeMap<ImagePath, bool> = BTreeMap::new();
    for record in records {
        *used.entry(record.path).or_default() |= record.is_dir;
    }

    util::print_trace_stats(&stats);
    util::print_stat("unique paths", used.len());

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (path, is_dir) in used {
        writeln!(out, "{}", format_record(&UsageRecord { path, is_dir }))?;
    }
    out.flush().context("Failed to write paths")?;

    Ok(())
}
