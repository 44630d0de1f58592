//! Imagescrape engine: browser session driving, extraction and downloads.
mod config;
mod discovery;
mod download;
mod extract;
mod fetch;
mod filename;
mod manifest;
mod orchestrator;
mod page;
mod persist;
mod session;
mod types;
mod webdriver;

pub use config::{ConfigError, ScraperConfig};
pub use discovery::ScrollDiscoveryEngine;
pub use download::{BatchDownloader, DownloadSettings, RetryPolicy, MAX_ATTEMPTS, MAX_CONCURRENCY};
pub use extract::LinkExtractor;
pub use fetch::{FetchSettings, ImageFetcher, NoopProgressSink, ProgressSink, ReqwestFetcher};
pub use filename::{
    choose_extension, extension_from_content_type, extension_from_url, image_file_stem,
    FilenameAllocator,
};
pub use manifest::{summarize, write_manifest, DownloadSummary, MANIFEST_FILENAME};
pub use orchestrator::ImageScraper;
pub use page::parse_rendered_images;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use session::{BrowserSession, RenderedImage, SessionError, SessionFactory};
pub use types::{
    DiscoveryEnd, DiscoveryReport, DownloadOutcome, EngineEvent, FailureKind, FetchError,
    FetchMetadata, FetchOutput, QueryReport, QueryStatus, RunReport, ScrapeError,
};
pub use webdriver::{BrowserKind, WebDriverSession, WebDriverSessionFactory, WebDriverSettings};

pub use imagescrape_core::{
    DiscoverySettings, ImageReference, Query, ReferenceSet, SearchSettings, SettingsError,
};
pub use tokio_util::sync::CancellationToken;
