use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "trajkit - streaming analysis of molecular dynamics trajectories into fixed-format data tables.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream trajectories through the columns of an analysis file and write the resulting table.
    Analyze(AnalyzeArgs),
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to the TOML analysis file describing topology, trajectories and columns.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Output table path. Overrides `[output] path`; the table goes to stdout if neither is set.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Read every N-th frame of each trajectory. Overrides `[loader] step`.
    #[arg(long, value_name = "N")]
    pub step: Option<usize>,

    /// Maximum number of frames kept in memory at once. Overrides `[loader] chunk-size`.
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Write comma-separated values with full precision instead of the formatted table.
    #[arg(long)]
    pub csv: bool,
}
