//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use scrape_logging::LogDestination;

/// Scroll image search results for each query and download every image found.
#[derive(Parser, Debug)]
#[command(name = "imagescrape")]
#[command(author, version, about)]
pub struct Args {
    /// Search terms, one query each (quote multi-word queries)
    pub queries: Vec<String>,

    /// RON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the images and manifest are written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// WebDriver endpoint, e.g. http://localhost:9515
    #[arg(long)]
    pub webdriver: Option<String>,

    /// Browser behind the WebDriver endpoint (chrome, firefox)
    #[arg(long)]
    pub browser: Option<String>,

    /// Path to the browser executable
    #[arg(long)]
    pub browser_binary: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long)]
    pub no_headless: bool,

    /// Wait after each scroll in milliseconds
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Consecutive scrolls without growth before a query is exhausted (min 2)
    #[arg(long)]
    pub no_growth: Option<u32>,

    /// Hard limit on scrolls per query
    #[arg(long)]
    pub max_scrolls: Option<u32>,

    /// Maximum concurrent downloads (1-64)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub concurrency: Option<u16>,

    /// Extra attempts for transient download failures (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: Option<u32>,

    /// Only download these extensions, comma separated (e.g. jpg,png,gif)
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Log file used by --log file and --log both
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}
