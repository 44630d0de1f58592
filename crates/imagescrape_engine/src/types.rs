use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use imagescrape_core::{ImageReference, Query};

use crate::session::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    UnsupportedExtension { extension: String },
    Write,
    Cancelled,
    Network,
}

impl FailureKind {
    /// Failures worth another attempt under a retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::HttpStatus(code) => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::UnsupportedExtension { extension } => {
                write!(f, "extension {extension} not in allow-list")
            }
            FailureKind::Write => write!(f, "write error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Result of downloading one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub reference: ImageReference,
    pub result: Result<PathBuf, FetchError>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// How a discovery loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryEnd {
    Exhausted,
    CeilingReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub iterations: u32,
    pub final_extent: u64,
    pub end: DiscoveryEnd,
}

/// Query-level failures. Item-level download failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    #[error("browser session unavailable: {0}")]
    SessionUnavailable(String),
    #[error("rendered page unusable: {0}")]
    ExtractionFailure(String),
    #[error("cannot build results url: {0}")]
    InvalidSearchUrl(String),
}

/// Only a gone browser is fatal to the session; script errors and page
/// timeouts fail the current query and leave the session open.
impl From<SessionError> for ScrapeError {
    fn from(err: SessionError) -> Self {
        if err.is_unavailable() {
            ScrapeError::SessionUnavailable(err.to_string())
        } else {
            ScrapeError::ExtractionFailure(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    DiscoveryTick {
        query: Query,
        iteration: u32,
        extent: u64,
    },
    QueryFinished {
        query: Query,
        new_references: usize,
    },
    DownloadFinished {
        url: String,
        result: Result<PathBuf, FailureKind>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Completed {
        discovery: DiscoveryReport,
        new_references: usize,
    },
    Failed(ScrapeError),
    /// Not attempted because the run was aborted earlier.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReport {
    pub query: Query,
    pub status: QueryStatus,
}

/// Outcome of the discovery phase across all queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub queries: Vec<QueryReport>,
    /// Set when the session could not be re-established and the run stopped.
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.queries
            .iter()
            .filter(|q| matches!(q.status, QueryStatus::Completed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.queries
            .iter()
            .filter(|q| matches!(q.status, QueryStatus::Failed(_)))
            .count()
    }
}
