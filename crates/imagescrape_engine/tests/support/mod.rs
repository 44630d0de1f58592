#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use imagescrape_engine::{
    BrowserSession, DiscoverySettings, EngineEvent, FailureKind, FetchError, FetchMetadata,
    FetchOutput, ImageFetcher, ProgressSink, RenderedImage, SessionError, SessionFactory,
};
use url::Url;

pub const EXTENT_PER_STAGE: u64 = 1_000;

pub fn fast_discovery(threshold: u32, ceiling: u32) -> DiscoverySettings {
    DiscoverySettings {
        settle_delay: Duration::ZERO,
        no_growth_threshold: threshold,
        max_iterations: ceiling,
    }
}

/// Image URLs revealed per stage: stage 0 is visible right after navigation,
/// stage `k` appears after the `k`-th scroll.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    pub stages: Vec<Vec<String>>,
}

impl Surface {
    pub fn new(stages: Vec<Vec<String>>) -> Self {
        Self { stages }
    }

    pub fn total(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }
}

/// In-memory results pages keyed by the `q` parameter of the navigated URL.
#[derive(Debug, Default)]
pub struct SimulatedSession {
    surfaces: HashMap<String, Surface>,
    current: Surface,
    revealed: usize,
    /// Extent grows on every scroll regardless of content.
    ever_growing: bool,
    growing_extent: u64,
    /// Fail with `Unavailable` once this many scrolls happened in total.
    die_after_scrolls: Option<usize>,
    /// Fail page reads with a non-fatal script error.
    broken_reads: bool,
    /// Fail scrolls with a non-fatal script error while this query is loaded.
    broken_scroll_query: Option<String>,
    current_query: String,
    scrolls: Arc<AtomicUsize>,
    navigations: Arc<Mutex<Vec<String>>>,
}

impl SimulatedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface(mut self, query: &str, surface: Surface) -> Self {
        self.surfaces.insert(query.to_string(), surface);
        self
    }

    pub fn ever_growing(mut self) -> Self {
        self.ever_growing = true;
        self
    }

    pub fn dying_after(mut self, scrolls: usize) -> Self {
        self.die_after_scrolls = Some(scrolls);
        self
    }

    pub fn with_broken_reads(mut self) -> Self {
        self.broken_reads = true;
        self
    }

    pub fn with_broken_scroll_on(mut self, query: &str) -> Self {
        self.broken_scroll_query = Some(query.to_string());
        self
    }

    pub fn scroll_counter(&self) -> Arc<AtomicUsize> {
        self.scrolls.clone()
    }

    pub fn navigations(&self) -> Arc<Mutex<Vec<String>>> {
        self.navigations.clone()
    }

    fn check_alive(&self) -> Result<(), SessionError> {
        match self.die_after_scrolls {
            Some(limit) if self.scrolls.load(Ordering::SeqCst) >= limit => {
                Err(SessionError::Unavailable("browser crashed".into()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl BrowserSession for SimulatedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.check_alive()?;
        let parsed = Url::parse(url).map_err(|err| SessionError::Protocol(err.to_string()))?;
        let query = parsed
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.navigations.lock().unwrap().push(query.clone());
        self.current = self.surfaces.get(&query).cloned().unwrap_or_default();
        self.current_query = query;
        self.revealed = 1;
        self.growing_extent = EXTENT_PER_STAGE;
        Ok(())
    }

    async fn scroll_to(&mut self, _extent: u64) -> Result<(), SessionError> {
        self.check_alive()?;
        if self.broken_scroll_query.as_deref() == Some(self.current_query.as_str()) {
            return Err(SessionError::WebDriver {
                error: "javascript error".into(),
                message: "scrollTo is not a function".into(),
            });
        }
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        self.revealed = (self.revealed + 1).min(self.current.stages.len().max(1));
        self.growing_extent += 100;
        Ok(())
    }

    async fn current_extent(&self) -> Result<u64, SessionError> {
        self.check_alive()?;
        if self.ever_growing {
            return Ok(self.growing_extent);
        }
        Ok(self.revealed as u64 * EXTENT_PER_STAGE)
    }

    async fn query_rendered_images(&self) -> Result<Vec<RenderedImage>, SessionError> {
        self.check_alive()?;
        if self.broken_reads {
            return Err(SessionError::WebDriver {
                error: "javascript error".into(),
                message: "document is not defined".into(),
            });
        }
        let mut images = Vec::new();
        for stage in self.current.stages.iter().take(self.revealed) {
            for url in stage {
                images.push(RenderedImage::new(Some(url.as_str()), None));
                // Every real result comes with a lazy placeholder next to it.
                images.push(RenderedImage::new(
                    Some("data:image/gif;base64,R0lGODlhAQABAAAAACw="),
                    Some(url.as_str()),
                ));
            }
        }
        Ok(images)
    }
}

/// Hands out prepared sessions in order; fails once they run out.
#[derive(Default)]
pub struct QueuedFactory {
    sessions: Mutex<VecDeque<SimulatedSession>>,
    opened: AtomicUsize,
}

impl QueuedFactory {
    pub fn new(sessions: Vec<SimulatedSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionFactory for QueuedFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(session) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(session))
            }
            None => Err(SessionError::Unavailable("webdriver refused connection".into())),
        }
    }
}

/// Shares a factory with the scraper while the test keeps a handle.
pub struct SharedFactory(pub Arc<QueuedFactory>);

#[async_trait::async_trait]
impl SessionFactory for SharedFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        self.0.open().await
    }
}

/// Serves a fixed body for every URL except the ones marked as failing.
#[derive(Default)]
pub struct FakeFetcher {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(url) {
            return Err(FetchError::new(FailureKind::Network, "connection refused"));
        }
        let bytes = Bytes::from_static(b"\x89PNG fake image");
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                redirect_count: 0,
                content_type: Some("image/png".to_string()),
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// `count` distinct URLs under `prefix`, numbered from `start`.
pub fn urls(prefix: &str, start: usize, count: usize) -> Vec<String> {
    (start..start + count)
        .map(|i| format!("https://img.example/{prefix}/{i}.jpg"))
        .collect()
}
