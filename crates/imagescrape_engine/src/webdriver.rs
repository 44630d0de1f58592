//! `BrowserSession` over the W3C WebDriver HTTP protocol.
//!
//! Talks to an already running chromedriver or geckodriver; launching the
//! driver process is left to the operator.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Method;
use scrape_logging::{scrape_debug, scrape_trace, scrape_warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::page::parse_rendered_images;
use crate::session::{BrowserSession, RenderedImage, SessionError, SessionFactory};

const SCROLL_SCRIPT: &str = "window.scrollTo(0, arguments[0]);\
var id = arguments[1];\
if (id) { var b = document.getElementById(id); if (b && b.offsetParent !== null) { b.click(); } }\
return null;";

const EXTENT_SCRIPT: &str = "var b = document.body ? document.body.scrollHeight : 0;\
return Math.max(b, document.documentElement.scrollHeight);";

/// WebDriver error codes that mean the browser side is gone.
const FATAL_ERRORS: &[&str] = &[
    "invalid session id",
    "no such window",
    "session not created",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

impl FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            other => Err(format!(
                "invalid browser type: \"{other}\", please choose between: [chrome, firefox]"
            )),
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserKind::Chrome => write!(f, "chrome"),
            BrowserKind::Firefox => write!(f, "firefox"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    /// Base URL of the driver, e.g. `http://localhost:9515`.
    pub endpoint: String,
    pub browser: BrowserKind,
    pub browser_binary: Option<PathBuf>,
    pub headless: bool,
    pub request_timeout: Duration,
    /// Element id clicked after each scroll when visible ("show more results").
    pub show_more_button_id: Option<String>,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            browser: BrowserKind::Chrome,
            browser_binary: None,
            headless: true,
            request_timeout: Duration::from_secs(60),
            show_more_button_id: Some("smb".to_string()),
        }
    }
}

impl WebDriverSettings {
    fn capabilities(&self) -> Value {
        let binary = self
            .browser_binary
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned());
        let (options_key, headless_arg) = match self.browser {
            BrowserKind::Chrome => ("goog:chromeOptions", "--headless=new"),
            BrowserKind::Firefox => ("moz:firefoxOptions", "-headless"),
        };

        let mut options = serde_json::Map::new();
        if self.headless {
            options.insert("args".into(), json!([headless_arg]));
        }
        if let Some(binary) = binary {
            options.insert("binary".into(), json!(binary));
        }

        let mut always_match = serde_json::Map::new();
        always_match.insert("browserName".into(), json!(self.browser.to_string()));
        always_match.insert(options_key.into(), Value::Object(options));

        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

pub struct WebDriverSession {
    client: reqwest::Client,
    session_url: String,
    session_id: String,
    show_more_button_id: Option<String>,
    closed: bool,
}

impl WebDriverSession {
    pub async fn connect(settings: &WebDriverSettings) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SessionError::Unavailable(err.to_string()))?;
        let endpoint = settings.endpoint.trim_end_matches('/').to_string();

        scrape_debug!(
            "building webdriver session browser={} endpoint={}",
            settings.browser,
            endpoint
        );
        let value = send(
            &client,
            Method::POST,
            &format!("{endpoint}/session"),
            Some(settings.capabilities()),
        )
        .await?;
        let created: NewSession = serde_json::from_value(value)
            .map_err(|err| SessionError::Protocol(format!("new session: {err}")))?;

        Ok(Self {
            client,
            session_url: format!("{endpoint}/session/{}", created.session_id),
            session_id: created.session_id,
            show_more_button_id: settings.show_more_button_id.clone(),
            closed: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SessionError> {
        if self.closed {
            return Err(SessionError::Unavailable("session already closed".into()));
        }
        let url = format!("{}{}", self.session_url, path);
        send(&self.client, method, &url, body).await
    }

    async fn execute(&self, script: &str, args: Value) -> Result<Value, SessionError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }
}

#[async_trait::async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn scroll_to(&mut self, extent: u64) -> Result<(), SessionError> {
        self.execute(
            SCROLL_SCRIPT,
            json!([extent, self.show_more_button_id.as_deref()]),
        )
        .await
        .map(|_| ())
    }

    async fn current_extent(&self) -> Result<u64, SessionError> {
        let value = self.execute(EXTENT_SCRIPT, json!([])).await?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .ok_or_else(|| SessionError::Protocol(format!("extent is not a number: {value}")))
    }

    async fn query_rendered_images(&self) -> Result<Vec<RenderedImage>, SessionError> {
        let value = self.command(Method::GET, "/source", None).await?;
        let html = value
            .as_str()
            .ok_or_else(|| SessionError::Protocol("page source is not a string".into()))?;
        Ok(parse_rendered_images(html))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.command(Method::DELETE, "", None).await {
            scrape_warn!("closing webdriver session {} failed: {}", self.session_id, err);
        }
        self.closed = true;
    }
}

async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, SessionError> {
    scrape_trace!("webdriver {} {}", method, url);
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request
        .send()
        .await
        .map_err(|err| SessionError::Unavailable(err.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| SessionError::Unavailable(err.to_string()))?;

    let wire: WireResponse = serde_json::from_str(&text)
        .map_err(|err| SessionError::Protocol(format!("http {status}: {err}")))?;

    if status.is_success() {
        return Ok(wire.value);
    }

    match serde_json::from_value::<WireError>(wire.value) {
        Ok(WireError { error, message }) if FATAL_ERRORS.contains(&error.as_str()) => {
            Err(SessionError::Unavailable(format!("{error}: {message}")))
        }
        Ok(WireError { error, message }) => Err(SessionError::WebDriver { error, message }),
        Err(_) => Err(SessionError::Protocol(format!("http {status} without error body"))),
    }
}

/// Opens a fresh WebDriver session per call.
#[derive(Debug, Clone)]
pub struct WebDriverSessionFactory {
    settings: WebDriverSettings,
}

impl WebDriverSessionFactory {
    pub fn new(settings: WebDriverSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl SessionFactory for WebDriverSessionFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let session = WebDriverSession::connect(&self.settings).await?;
        Ok(Box::new(session))
    }
}
