// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Anything left out is asked for on the terminal.
#[derive(Parser, Debug)]
#[command(author, version, about = "Mine a Git repository's history and chart metrics over it", long_about = None)]
pub struct Args {
    /// File holding the extracted commits (created if missing)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Clone URL of the repository to follow
    #[arg(long)]
    pub repo_uri: Option<String>,

    /// Personal access token used as the transport user name
    #[arg(long, env = "GIT_CURTAIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory the repository is mirrored into
    #[arg(long)]
    pub repo_path: Option<PathBuf>,

    /// Branch to extract commits from
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Time between repository update checks, in milliseconds (empty for 3 hours)
    #[arg(long, allow_hyphen_values = true)]
    pub poll_interval_ms: Option<String>,

    /// Accept poll intervals below one minute without asking
    #[arg(long)]
    pub confirm_low_interval: bool,

    /// Self-affirmed refactoring keywords, one regex per line
    #[arg(short, long)]
    pub keywords: Option<PathBuf>,

    /// PNG file the chart is drawn to
    #[arg(short, long, default_value = "curtain.png")]
    pub output: PathBuf,

    /// Width of the chart in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Height of the chart in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,
}
