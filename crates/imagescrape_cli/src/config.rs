//! RON configuration file, merged with command line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use imagescrape_engine::{
    BrowserKind, DiscoverySettings, DownloadSettings, FetchSettings, Query, RetryPolicy,
    ScraperConfig, SearchSettings, WebDriverSettings,
};
use serde::Deserialize;

use crate::cli::Args;

const DEFAULT_OUTPUT_DIR: &str = "img/repository";
const DEFAULT_LOG_FILE: &str = "imagescrape.log";

/// Every field is optional in the file; missing ones keep their default.
///
/// ```ron
/// (
///     queries: ["minecraft", "minecraft pig"],
///     browser: "firefox",
///     settle_ms: 1500,
///     extensions: ["jpg", "png", "gif"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub queries: Vec<String>,
    pub output_dir: PathBuf,
    pub search_url: String,
    pub webdriver_url: String,
    pub browser: String,
    pub browser_binary: Option<PathBuf>,
    pub headless: bool,
    pub show_more_button_id: Option<String>,
    pub settle_ms: u64,
    pub no_growth_threshold: u32,
    pub max_scrolls: u32,
    pub concurrency: usize,
    pub retries: u32,
    pub extensions: Vec<String>,
    pub request_timeout_secs: u64,
    pub max_image_mib: u64,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let discovery = DiscoverySettings::default();
        let webdriver = WebDriverSettings::default();
        let fetch = FetchSettings::default();
        let download = DownloadSettings::default();
        Self {
            queries: Vec::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            search_url: SearchSettings::default().base_url,
            webdriver_url: webdriver.endpoint,
            browser: webdriver.browser.to_string(),
            browser_binary: None,
            headless: webdriver.headless,
            show_more_button_id: webdriver.show_more_button_id,
            settle_ms: discovery.settle_delay.as_millis() as u64,
            no_growth_threshold: discovery.no_growth_threshold,
            max_scrolls: discovery.max_iterations,
            concurrency: download.concurrency,
            retries: download.retry.max_attempts.saturating_sub(1),
            extensions: Vec::new(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            max_image_mib: fetch.max_bytes / (1024 * 1024),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        ron::from_str(&content).with_context(|| format!("failed to parse config file {path:?}"))
    }

    /// Flags given on the command line win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if !args.queries.is_empty() {
            self.queries = args.queries.clone();
        }
        if let Some(output) = &args.output {
            self.output_dir = output.clone();
        }
        if let Some(url) = &args.webdriver {
            self.webdriver_url = url.clone();
        }
        if let Some(browser) = &args.browser {
            self.browser = browser.clone();
        }
        if let Some(binary) = &args.browser_binary {
            self.browser_binary = Some(binary.clone());
        }
        if args.no_headless {
            self.headless = false;
        }
        if let Some(ms) = args.settle_ms {
            self.settle_ms = ms;
        }
        if let Some(threshold) = args.no_growth {
            self.no_growth_threshold = threshold;
        }
        if let Some(max) = args.max_scrolls {
            self.max_scrolls = max;
        }
        if let Some(concurrency) = args.concurrency {
            self.concurrency = usize::from(concurrency);
        }
        if let Some(retries) = args.retries {
            self.retries = retries;
        }
        if !args.extensions.is_empty() {
            self.extensions = args.extensions.clone();
        }
        if let Some(log_file) = &args.log_file {
            self.log_file = log_file.clone();
        }
    }

    pub fn queries(&self) -> Result<Vec<Query>> {
        let queries = self
            .queries
            .iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(Query::new)
            .collect::<Result<Vec<_>, _>>()?;
        if queries.is_empty() {
            bail!("no search queries given");
        }
        Ok(queries)
    }

    pub fn to_scraper_config(&self) -> Result<ScraperConfig> {
        let browser: BrowserKind = self.browser.parse().map_err(anyhow::Error::msg)?;

        let config = ScraperConfig {
            search: SearchSettings {
                base_url: self.search_url.clone(),
                ..SearchSettings::default()
            },
            discovery: DiscoverySettings {
                settle_delay: Duration::from_millis(self.settle_ms),
                no_growth_threshold: self.no_growth_threshold,
                max_iterations: self.max_scrolls,
            },
            webdriver: WebDriverSettings {
                endpoint: self.webdriver_url.clone(),
                browser,
                browser_binary: self.browser_binary.clone(),
                headless: self.headless,
                show_more_button_id: self.show_more_button_id.clone(),
                ..WebDriverSettings::default()
            },
            fetch: FetchSettings {
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                max_bytes: self.max_image_mib.saturating_mul(1024 * 1024),
                ..FetchSettings::default()
            },
            download: DownloadSettings {
                concurrency: self.concurrency,
                allowed_extensions: self
                    .extensions
                    .iter()
                    .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect(),
                retry: RetryPolicy {
                    max_attempts: self.retries.saturating_add(1),
                    ..RetryPolicy::default()
                },
            },
        };
        config.validate()?;
        Ok(config)
    }
}
