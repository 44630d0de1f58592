use std::collections::HashSet;

use imagescrape_core::{ImageReference, Query, ReferenceSet};
use scrape_logging::{scrape_debug, scrape_info};
use url::Url;

use crate::session::{BrowserSession, RenderedImage};
use crate::ScrapeError;

/// Reads rendered image elements and keeps the ones not yet accumulated.
///
/// Only a resolved absolute `http(s)` `src` qualifies. Elements whose `src` is
/// still a placeholder (missing, relative, `data:`) are skipped even if a lazy
/// attribute already names the eventual URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkExtractor;

impl LinkExtractor {
    pub async fn extract(
        &self,
        session: &dyn BrowserSession,
        query: &Query,
        known: &ReferenceSet,
    ) -> Result<Vec<ImageReference>, ScrapeError> {
        let rendered = session.query_rendered_images().await?;
        scrape_info!(
            "query=\"{}\" number of images found: {}",
            query,
            rendered.len()
        );
        Ok(self.select_new(&rendered, query, known))
    }

    /// Pure part of [`extract`](Self::extract), usable on any snapshot.
    pub fn select_new(
        &self,
        rendered: &[RenderedImage],
        query: &Query,
        known: &ReferenceSet,
    ) -> Vec<ImageReference> {
        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        for image in rendered {
            let Some(url) = image.src.as_deref().and_then(resolved_source) else {
                continue;
            };
            if known.contains(&url) || !seen.insert(url.clone()) {
                continue;
            }
            scrape_debug!("found image url: {}", url);
            fresh.push(ImageReference::new(url, query.clone()));
        }
        fresh
    }
}

fn resolved_source(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = Url::parse(trimmed).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url.into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_and_relative_sources_are_excluded() {
        let query = Query::new("q").unwrap();
        let rendered = vec![
            RenderedImage::new(Some("data:image/gif;base64,R0lGOD"), Some("https://x/a.jpg")),
            RenderedImage::new(None, Some("https://x/b.jpg")),
            RenderedImage::new(Some("/thumb/c.jpg"), None),
            RenderedImage::new(Some("  "), None),
            RenderedImage::new(Some("javascript:void(0)"), None),
            RenderedImage::new(Some("https://x/d.jpg"), None),
        ];

        let fresh = LinkExtractor.select_new(&rendered, &query, &ReferenceSet::new());
        let urls: Vec<_> = fresh.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x/d.jpg"]);
    }
}
