//! Command-line interface definitions for hn_harvester.
//!
//! Every flag is optional. Unset flags fall back to the config file given with
//! `--config`, then to built-in defaults (see [`crate::config::Settings`]).

use crate::config::CompletionMode;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Poll every 5 seconds with 5 workers into ./downloaded
/// hn_harvester
///
/// # Custom directory, slower polling, more workers
/// hn_harvester -d /srv/hn -r 60 -w 16
///
/// # Only treat a story as done once a marker file is written
/// hn_harvester --completion marker
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory to download into, default ./downloaded (must already exist)
    #[arg(short, long, env = "HN_HARVESTER_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// How often to check for news, in seconds, default 5
    #[arg(short, long, env = "HN_HARVESTER_REFRESH")]
    pub refresh: Option<u64>,

    /// Maximum number of concurrent fetches, default 5
    #[arg(short, long, env = "HN_HARVESTER_WORKERS")]
    pub workers: Option<usize>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How to decide a story was already downloaded
    #[arg(long, value_enum)]
    pub completion: Option<CompletionMode>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,
}
