//! imgtrim CLI - plan which directories of a container image can be deleted

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use trace::{MountPrefix, TraceFormat};
use trim_core::ImagePath;

mod cmd;
mod config;
mod util;

/// imgtrim - Trim container images down to the paths a workload touches
#[derive(Parser)]
#[command(name = "imgtrim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: $IMGTRIM_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the deletion plan, one directory per line
    Plan(PlanArgs),
    /// Print the normalized paths a set of traces used
    Paths(TraceArgs),
    /// List the directories of an extracted image root
    Scan {
        /// Extracted image root
        root: PathBuf,
        /// Include non-directory entries
        #[arg(long)]
        include_files: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Trace inputs shared by `plan` and `paths`
#[derive(Args, Debug, Clone)]
pub struct TraceArgs {
    /// Syscall tracer log (repeatable)
    #[arg(long = "strace", value_name = "FILE")]
    pub strace: Vec<PathBuf>,

    /// Filesystem-watch CSV log (repeatable)
    #[arg(long = "watch", value_name = "FILE")]
    pub watch: Vec<PathBuf>,

    /// Used-path list as written by `imgtrim paths` (repeatable)
    #[arg(long = "path-list", value_name = "FILE")]
    pub path_list: Vec<PathBuf>,

    /// Trace whose format is guessed from its extension (repeatable)
    #[arg(long = "trace", value_name = "FILE")]
    pub trace: Vec<PathBuf>,

    /// Host mount point stripped from watch events, `*` matches one segment
    #[arg(long, value_name = "PATTERN")]
    pub mount_prefix: Option<MountPrefix>,

    /// Treat every syscall path as a directory
    #[arg(long)]
    pub assume_dirs: bool,
}

impl TraceArgs {
    /// Every trace file with its format, in argument order per kind
    pub fn sources(&self) -> Vec<(PathBuf, TraceFormat)> {
        let tagged = |paths: &[PathBuf], format: TraceFormat| {
            paths
                .iter()
                .map(move |p| (p.clone(), format))
                .collect::<Vec<_>>()
        };

        let mut sources = tagged(&self.strace, TraceFormat::Syscall);
        sources.extend(tagged(&self.watch, TraceFormat::Watch));
        sources.extend(tagged(&self.path_list, TraceFormat::PathList));
        sources.extend(self.trace.iter().map(|p| (p.clone(), TraceFormat::detect(p))));
        sources
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub traces: TraceArgs,

    /// Listing of every path in the image, one per line
    #[arg(
        long,
        value_name = "FILE",
        required_unless_present = "rootfs",
        conflicts_with = "rootfs"
    )]
    pub inventory: Option<PathBuf>,

    /// Extracted image root to walk instead of a listing
    #[arg(long, value_name = "DIR")]
    pub rootfs: Option<PathBuf>,

    /// Include non-directory entries when walking --rootfs
    #[arg(long, requires = "rootfs")]
    pub include_files: bool,

    /// Path that must never be deleted (repeatable)
    #[arg(long = "allow", value_name = "PATH")]
    pub allow: Vec<ImagePath>,

    /// File of allow-list paths, one per line, `#` comments
    #[arg(long = "allow-file", value_name = "FILE")]
    pub allow_file: Vec<PathBuf>,

    /// Match allow-list entries by path ancestry instead of string prefix
    #[arg(long)]
    pub strict_allow: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    util::init_tracing(cli.verbose);

    let (config, config_path) = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan(args) => cmd::plan::run(args, config).await,
        Commands::Paths(args) => cmd::paths::run(args, config).await,
        Commands::Scan { root, include_files } => cmd::scan::run(&root, include_files).await,
        Commands::Config => cmd::config::run(&config, config_path.as_deref()).await,
    }
}
