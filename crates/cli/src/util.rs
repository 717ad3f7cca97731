//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use trace::{FormatParser, TraceFormat, TraceOptions, TraceRecords, TraceStats};
use trim_core::{AllowList, Inventory, PlanWarning, UsageRecord};
use tracing::Level;

/// Install the stderr log subscriber
///
/// Warnings by default; each `-v` lowers the threshold one level.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn file_bar(multi: &MultiProgress, path: &Path) -> Result<ProgressBar> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    // Length is set once the file is open
    let pb = multi.add(ProgressBar::new(0));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:20} [{bar:30.cyan/blue}] {bytes}/{total_bytes}")?
            .progress_chars("=>-"),
    );
    pb.set_message(name);
    Ok(pb)
}

fn parse_trace_file(
    path: &Path,
    format: TraceFormat,
    options: &TraceOptions,
    pb: ProgressBar,
) -> Result<(Vec<UsageRecord>, TraceStats)> {
    let file = trace::open_input(path)?;
    if let Ok(meta) = file.metadata() {
        pb.set_length(meta.len());
    }

    let mut stream = TraceRecords::new(
        BufReader::new(pb.wrap_read(file)),
        FormatParser::new(format, options),
        path,
    );
    let records: Vec<UsageRecord> = stream.by_ref().collect();
    let stats = stream.finish()?;
    pb.finish_and_clear();

    tracing::info!(
        source = %path.display(),
        %format,
        records = stats.records,
        skipped = stats.skipped_lines,
        "parsed trace"
    );
    Ok((records, stats))
}

/// Parse every trace on the blocking pool, one task per file
///
/// Records from all sources are concatenated; any missing or unreadable
/// file fails the whole load.
pub async fn load_traces(
    sources: Vec<(PathBuf, TraceFormat)>,
    options: &TraceOptions,
) -> Result<(Vec<UsageRecord>, TraceStats)> {
    let multi = MultiProgress::new();
    let mut tasks = JoinSet::new();

    for (path, format) in sources {
        let pb = file_bar(&multi, &path)?;
        let options = options.clone();
        tasks.spawn_blocking(move || {
            parse_trace_file(&path, format, &options, pb)
                .with_context(|| format!("Failed to parse {} trace {}", format, path.display()))
        });
    }

    let mut records = Vec::new();
    let mut stats = TraceStats::default();
    while let Some(joined) = tasks.join_next().await {
        let (mut parsed, parsed_stats) = joined.context("Trace parsing task failed")??;
        records.append(&mut parsed);
        stats += parsed_stats;
    }

    Ok((records, stats))
}

/// Merge allow-list paths from the config, the command line and allow files
pub fn load_allow_list(
    from_config: &[trim_core::ImagePath],
    from_args: &[trim_core::ImagePath],
    files: &[PathBuf],
) -> Result<AllowList> {
    let mut allow: AllowList = from_config.iter().chain(from_args).cloned().collect();
    for file in files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read allow file {}", file.display()))?;
        let parsed = AllowList::from_lines(&text)
            .with_context(|| format!("Invalid allow file {}", file.display()))?;
        allow.extend(parsed.iter().cloned());
    }
    Ok(allow)
}

/// Load an inventory from a listing or by walking an extracted root
pub fn load_inventory(
    listing: Option<&Path>,
    rootfs: Option<&Path>,
    include_files: bool,
) -> Result<Inventory> {
    let (inventory, stats) = match (listing, rootfs) {
        (Some(listing), _) => trace::read_inventory(listing)
            .with_context(|| format!("Failed to load inventory {}", listing.display()))?,
        (None, Some(root)) => trace::scan_rootfs(root, !include_files)
            .with_context(|| format!("Failed to scan {}", root.display()))?,
        (None, None) => anyhow::bail!("An inventory is required: pass --inventory or --rootfs"),
    };

    if stats.walk_errors > 0 {
        eprintln!(
            "{} {} entries could not be read and were left out of the inventory",
            "warning:".if_supports_color(Stream::Stderr, |t| t.yellow()),
            stats.walk_errors
        );
    }
    Ok(inventory)
}

/// Print one aligned `label: value` line to stderr
pub fn print_stat(label: &str, value: impl std::fmt::Display) {
    eprintln!(
        "{:<16} {}",
        format!("{}:", label),
        value.if_supports_color(Stream::Stderr, |t| t.cyan())
    );
}

/// Print trace counters to stderr
pub fn print_trace_stats(stats: &TraceStats) {
    print_stat("lines read", stats.lines);
    print_stat("records", stats.records);
    if stats.failed_calls > 0 {
        print_stat("failed calls", stats.failed_calls);
    }
    if stats.skipped_lines > 0 {
        print_stat("skipped lines", stats.skipped_lines);
    }
    if stats.discarded_paths > 0 {
        print_stat("discarded paths", stats.discarded_paths);
    }
    if stats.outside_mount > 0 {
        print_stat("outside mount", stats.outside_mount);
    }
}

/// Print plan warnings to stderr
pub fn print_warnings(warnings: &[PlanWarning]) {
    for warning in warnings {
        eprintln!(
            "{} {}",
            "warning:".if_supports_color(Stream::Stderr, |t| t.yellow().bold().to_string()),
            warning
        );
    }
}
