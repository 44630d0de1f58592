use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::config::ConfigError;
use crate::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Exact types or `type/*` wildcards. A missing Content-Type is accepted.
    pub allowed_content_types: Vec<String>,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 20 * 1024 * 1024,
            allowed_content_types: vec!["image/*".to_string()],
            user_agent: None,
        }
    }
}

impl FetchSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroConnectTimeout);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::ZeroMaxBytes);
        }
        Ok(())
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

/// `ImageFetcher` over reqwest. Each fetch gets its own client so the
/// redirect policy can report how many hops the request took.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn client_counting_redirects(
        &self,
        hops: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, FetchError> {
        let limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let followed = attempt.previous().len();
            hops.store(followed, Ordering::Relaxed);
            if followed > limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        let builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy);
        let builder = match self.settings.user_agent.as_deref() {
            Some(agent) => builder.user_agent(agent),
            None => builder,
        };
        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|pattern| content_type_matches(pattern, essence))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "image exceeds size limit",
        )
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Bytes, FetchError> {
        let mut body = BytesMut::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let total = (body.len() + chunk.len()) as u64;
            if total > self.settings.max_bytes {
                return Err(self.too_large(total));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait::async_trait]
impl ImageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let target = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let hops = Arc::new(AtomicUsize::new(0));
        let client = self.client_counting_redirects(hops.clone())?;

        let response = client.get(target).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        if let Some(declared) = response.content_length() {
            if declared > self.settings.max_bytes {
                return Err(self.too_large(declared));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(content_type) = content_type.as_deref().filter(|ct| !self.accepts(ct)) {
            return Err(FetchError::new(
                FailureKind::UnsupportedContentType {
                    content_type: content_type.to_string(),
                },
                "not an image",
            ));
        }

        let final_url = response.url().to_string();
        let bytes = self.read_body(response).await?;
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url,
                redirect_count: hops.load(Ordering::Relaxed),
                content_type,
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

/// `image/*` matches any image subtype; anything else must match exactly.
fn content_type_matches(pattern: &str, essence: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(major) => essence
            .split_once('/')
            .is_some_and(|(m, _)| m.eq_ignore_ascii_case(major)),
        None => pattern.eq_ignore_ascii_case(essence),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_redirect() {
        FailureKind::RedirectLimitExceeded
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeouts_and_size_limit_are_rejected() {
        assert!(FetchSettings::default().validate().is_ok());

        let settings = FetchSettings {
            request_timeout: Duration::ZERO,
            ..FetchSettings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::ZeroRequestTimeout));

        let settings = FetchSettings {
            connect_timeout: Duration::ZERO,
            ..FetchSettings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::ZeroConnectTimeout));

        let settings = FetchSettings {
            max_bytes: 0,
            ..FetchSettings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::ZeroMaxBytes));
    }

    #[test]
    fn wildcard_content_types_match_by_major_type() {
        assert!(content_type_matches("image/*", "image/webp"));
        assert!(content_type_matches("IMAGE/*", "image/png"));
        assert!(!content_type_matches("image/*", "text/html"));
        assert!(content_type_matches("image/png", "image/PNG"));
        assert!(!content_type_matches("image/png", "image/jpeg"));
    }
}
