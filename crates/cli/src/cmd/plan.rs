//! Compute and print a deletion plan

use crate::config::AppConfig;
use crate::util;
use crate::PlanArgs;
use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use std::io::{BufWriter, Write};
use trim_core::{AllowMatch, ClosureSet, DeletionPlanner};

pub async fn run(args: PlanArgs, config: AppConfig) -> Result<()> {
    // 1. Resolve trace inputs
    let sources = args.traces.sources();
    if sources.is_empty() {
        anyhow::bail!("No trace given: pass --strace, --watch, --path-list or --trace");
    }
    let mut options = config.trace.clone();
    if args.traces.mount_prefix.is_some() {
        options.mount_prefix = args.traces.mount_prefix.clone();
    }
    options.assume_directories |= args.traces.assume_dirs;

    // 2. Load everything before computing, so a bad input fails fast
    let allow = util::load_allow_list(&config.allow, &args.allow, &args.allow_file)?;
    let inventory = util::load_inventory(
        args.inventory.as_deref(),
        args.rootfs.as_deref(),
        args.include_files,
    )?;
    let (records, stats) = util::load_traces(sources, &options).await?;

    // 3. Used paths, closed under ancestry, then reduced
    let record_count = records.len();
    let closure = ClosureSet::from_records(records);
    let frontier = trim_core::reduce(&closure);

    // 4. Plan against the reduced set
    let mut planner_config = config.planner.clone();
    if args.strict_allow {
        planner_config.allow_match = AllowMatch::Strict;
    }
    planner_config.validate()?;
    let report = DeletionPlanner::new(planner_config).plan(&inventory, &frontier, &allow);

    // 5. Diagnostics on stderr, the plan alone on stdout
    util::print_trace_stats(&stats);
    util::print_stat("used records", record_count);
    util::print_stat("closure size", closure.len());
    util::print_stat("reduced size", frontier.len());
    util::print_stat("allow entries", allow.len());
    util::print_stat("inventory size", report.inventory_size);
    util::print_stat(
        "plan size",
        format!("{} (removes {} inventory paths)", report.plan.len(), report.covered),
    );
    util::print_warnings(&report.warnings);
    if report.plan.is_empty() {
        eprintln!(
            "{}",
            "Nothing to delete".if_supports_color(Stream::Stderr, |t| t.green())
        );
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for path in &report.plan {
        writeln!(out, "{}", path)?;
    }
    out.flush().context("Failed to write plan")?;

    Ok(())
}
