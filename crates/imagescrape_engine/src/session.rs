/// An image-bearing element as currently rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedImage {
    /// The `src` attribute as rendered.
    pub src: Option<String>,
    /// Lazy-load attribute (`data-src` and friends) if the element has one.
    pub lazy_src: Option<String>,
}

impl RenderedImage {
    pub fn new(src: Option<&str>, lazy_src: Option<&str>) -> Self {
        Self {
            src: src.map(str::to_string),
            lazy_src: lazy_src.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The browser crashed, disconnected or the session was torn down.
    #[error("session unavailable: {0}")]
    Unavailable(String),
    #[error("webdriver error {error}: {message}")]
    WebDriver { error: String, message: String },
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl SessionError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SessionError::Unavailable(_))
    }
}

/// Capability set the scraper needs from a live browsing context.
///
/// `navigate` resets all page state. Reads never change what is rendered.
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    async fn scroll_to(&mut self, extent: u64) -> Result<(), SessionError>;

    /// Scalar measure of loaded content (rendered document height).
    async fn current_extent(&self) -> Result<u64, SessionError>;

    async fn query_rendered_images(&self) -> Result<Vec<RenderedImage>, SessionError>;

    /// Release the underlying browser. Errors are not interesting at this point.
    async fn close(&mut self) {}
}

/// Opens sessions; used to re-establish one after a crash.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}
