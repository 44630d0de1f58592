use imagescrape_core::{DiscoverySettings, SearchSettings, SettingsError};

use crate::download::DownloadSettings;
use crate::fetch::FetchSettings;
use crate::webdriver::WebDriverSettings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Discovery(#[from] SettingsError),
    #[error("download concurrency must be between 1 and 64, got {0}")]
    ConcurrencyOutOfRange(usize),
    #[error("download attempts must be between 1 and 11, got {0}")]
    AttemptsOutOfRange(u32),
    #[error("connect timeout must be greater than zero")]
    ZeroConnectTimeout,
    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,
    #[error("maximum image size must be greater than zero")]
    ZeroMaxBytes,
}

/// Everything the scraper needs besides the session and fetcher instances.
#[derive(Debug, Clone, Default)]
pub struct ScraperConfig {
    pub search: SearchSettings,
    pub discovery: DiscoverySettings,
    pub webdriver: WebDriverSettings,
    pub fetch: FetchSettings,
    pub download: DownloadSettings,
}

impl ScraperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.discovery.validate()?;
        self.fetch.validate()?;
        self.download.validate()
    }
}
