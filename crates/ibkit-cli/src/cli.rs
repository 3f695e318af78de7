//! CLI argument definitions for ibkit.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `levels` | Session and initial balance levels per day |
//! | `export` | Write levels to a CSV file |
//! | `sessions` | Session definitions and next boundaries |
//! | `instruments` | Supported instrument catalog |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table, csv) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings and errors as failures |
//!
//! # Caching and Rate Limits
//!
//! Each invocation builds its own in-memory store, so the response cache and
//! the rate-limit window live only for that process. `meta.cache_hit` is
//! always `false` from the CLI, and a single command is counted as one
//! request: only `IBKIT_RATE_LIMIT=0` rejects it (exit code 6). Embedders
//! that keep a `LevelService` alive get both behaviors across requests.
//!
//! # Examples
//!
//! ```bash
//! ibkit levels --instruments ES,NQ --start 2024-01-02 --end 2024-01-05 --session new-york
//! ibkit --format csv levels --instruments GC --start 2024-01-02 --end 2024-01-02 --session asia
//! ibkit export --instruments ES --start 2024-01-02 --end 2024-01-05 --data-dir ./bars
//! ibkit sessions --at 2024-01-02T14:00:00Z --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Initial Balance levels for futures sessions.
#[derive(Debug, Parser)]
#[command(
    name = "ibkit",
    author,
    version,
    about = "Initial Balance trading levels for futures sessions",
    long_about = "ibkit computes session open/close/high/low and the 1-hour and 15-minute \
Initial Balance ranges for the Asia, London and New York sessions.\n\
\n\
Bars are read from a directory of per-instrument CSV files, or generated \
synthetically when no directory is given.\n\
\n\
Use 'ibkit <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON envelope.
    Json,
    /// Plain text for terminal display.
    Table,
    /// CSV rows (level commands only).
    Csv,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute trading levels for a date range.
    ///
    /// # Examples
    ///
    ///   ibkit levels --instruments ES,NQ --start 2024-01-02 --end 2024-01-05
    ///   ibkit levels --instruments CL --start 2024-01-02 --end 2024-01-02 --session london
    Levels(LevelsArgs),

    /// Compute trading levels and write them to a CSV file.
    Export(ExportArgs),

    /// Show session definitions, activity and the next boundary.
    Sessions(SessionsArgs),

    /// List supported instruments.
    Instruments,
}

/// Instrument, date and session selection shared by level commands.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Comma-separated instrument symbols.
    #[arg(long, default_value = "ES,NQ")]
    pub instruments: String,

    /// First calendar date (YYYY-MM-DD, US Eastern).
    #[arg(long)]
    pub start: String,

    /// Last calendar date, inclusive (YYYY-MM-DD, US Eastern).
    #[arg(long)]
    pub end: String,

    /// Session: asia, london or new-york.
    #[arg(long, default_value = "new-york")]
    pub session: String,

    /// Directory of `<SYMBOL>.csv` bar files; synthetic bars when absent.
    #[arg(long, env = "IBKIT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Client identifier used for rate limiting.
    #[arg(long, default_value = "local")]
    pub client_id: String,
}

#[derive(Debug, Clone, Args)]
pub struct LevelsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output path; defaults to a generated `IBLevels_...csv` name.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SessionsArgs {
    /// Evaluate at this RFC3339 instant instead of now.
    #[arg(long)]
    pub at: Option<String>,

    /// Minutes before a boundary that count as near.
    #[arg(long, default_value_t = ibkit_core::DEFAULT_BOUNDARY_THRESHOLD_MINUTES)]
    pub threshold_minutes: i64,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_levels_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ibkit",
            "levels",
            "--instruments",
            "ES,MNQ",
            "--start",
            "2024-01-02",
            "--end",
            "2024-01-05",
            "--format",
            "csv",
        ])
        .expect("parse");

        assert_eq!(cli.format, OutputFormat::Csv);
        let Command::Levels(args) = cli.command else {
            panic!("expected levels command");
        };
        assert_eq!(args.selection.instruments, "ES,MNQ");
        assert_eq!(args.selection.session, "new-york");
    }
}
