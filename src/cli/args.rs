//! CLI argument structs for all subcommands.

use clap::Parser;

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Repository or skin-pack directory to check
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Space-separated path patterns to skip; a file whose absolute path
    /// contains any of them is not checked
    #[arg(short, long)]
    pub ignore: Option<String>,

    /// Print only the summary lines, not individual diagnostics
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Repository or skin-pack directory to watch
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Space-separated path patterns to skip
    #[arg(short, long)]
    pub ignore: Option<String>,

    /// Debounce window in milliseconds before re-checking a change batch
    #[arg(long, default_value = "500")]
    pub debounce_ms: u64,
}
