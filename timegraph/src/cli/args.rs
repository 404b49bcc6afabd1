//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "timegraph",
    about = "Build and inspect capture timelines",
    after_help = "\
EXAMPLES:
    timegraph --demo --duration 5 --export demo     Record a synthetic capture to demo.orbit
    timegraph --replay demo.orbit                   Summarize a saved capture
    timegraph --replay demo.orbit --thread-filter worker"
)]
pub struct Args {
    /// Load a saved capture
    #[arg(long, value_name = "FILE", conflicts_with = "demo")]
    pub replay: Option<PathBuf>,

    /// Record from the built-in synthetic producer
    #[arg(long)]
    pub demo: bool,

    /// Demo recording length in seconds
    #[arg(long, default_value = "3")]
    pub duration: u64,

    /// Save the capture (".orbit" is appended when missing)
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Only show threads whose name contains one of these space separated tokens
    #[arg(long, value_name = "TOKENS")]
    pub thread_filter: Option<String>,

    /// How much of the capture end the initial view shows
    #[arg(long, default_value = "2.0")]
    pub history_seconds: f64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
