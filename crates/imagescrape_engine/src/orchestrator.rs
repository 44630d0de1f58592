use std::path::Path;
use std::sync::Arc;

use imagescrape_core::{ImageReference, Query, ReferenceSet, SearchSettings};
use scrape_logging::{scrape_error, scrape_info, scrape_warn};
use tokio_util::sync::CancellationToken;

use crate::discovery::ScrollDiscoveryEngine;
use crate::download::BatchDownloader;
use crate::extract::LinkExtractor;
use crate::fetch::{ImageFetcher, NoopProgressSink, ProgressSink};
use crate::session::{BrowserSession, SessionError, SessionFactory};
use crate::{
    DiscoveryReport, DownloadOutcome, EngineEvent, QueryReport, QueryStatus, RunReport,
    ScrapeError, ScraperConfig,
};

/// Drives queries through one reusable browser session and accumulates the
/// discovered references for a single download batch.
///
/// The session is opened on first use and kept across queries. When it dies
/// it is dropped and the next query opens a new one.
pub struct ImageScraper {
    factory: Box<dyn SessionFactory>,
    session: Option<Box<dyn BrowserSession>>,
    references: ReferenceSet,
    search: SearchSettings,
    discovery: ScrollDiscoveryEngine,
    extractor: LinkExtractor,
    downloader: BatchDownloader,
    sink: Arc<dyn ProgressSink>,
}

impl ImageScraper {
    pub fn new(
        config: ScraperConfig,
        factory: Box<dyn SessionFactory>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            factory,
            session: None,
            references: ReferenceSet::new(),
            search: config.search,
            discovery: ScrollDiscoveryEngine::new(config.discovery),
            extractor: LinkExtractor,
            downloader: BatchDownloader::new(fetcher, config.download),
            sink: Arc::new(NoopProgressSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Scroll the query's results surface to exhaustion, extract image
    /// references and merge them. Returns only references new to this run.
    pub async fn discover_and_extract(
        &mut self,
        query: &Query,
    ) -> Result<Vec<ImageReference>, ScrapeError> {
        self.ensure_session()
            .await
            .map_err(|err| ScrapeError::SessionUnavailable(err.to_string()))?;
        self.discover_query(query).await.map(|(_, added)| added)
    }

    /// Process every query in order. A failed query never stops the others;
    /// only an unrecoverable session aborts the remainder.
    pub async fn run_queries(&mut self, queries: &[Query]) -> RunReport {
        let mut report = RunReport::default();
        for query in queries {
            if report.aborted.is_some() {
                report.queries.push(QueryReport {
                    query: query.clone(),
                    status: QueryStatus::Skipped,
                });
                continue;
            }

            if let Err(err) = self.ensure_session().await {
                scrape_error!("cannot establish browser session: {}", err);
                report.aborted = Some(format!("cannot establish browser session: {err}"));
                report.queries.push(QueryReport {
                    query: query.clone(),
                    status: QueryStatus::Skipped,
                });
                continue;
            }

            let status = match self.discover_query(query).await {
                Ok((discovery, added)) => QueryStatus::Completed {
                    discovery,
                    new_references: added.len(),
                },
                Err(err) => {
                    scrape_warn!("query=\"{}\" failed: {}", query, err);
                    QueryStatus::Failed(err)
                }
            };
            report.queries.push(QueryReport {
                query: query.clone(),
                status,
            });
        }
        report
    }

    /// Download every accumulated reference into `destination`.
    pub async fn download_all(
        &self,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Vec<DownloadOutcome> {
        self.downloader
            .download_all(&self.references, destination, cancel, self.sink.as_ref())
            .await
    }

    /// Release the browser session, if one is open.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }

    async fn ensure_session(&mut self) -> Result<(), SessionError> {
        if self.session.is_none() {
            scrape_info!("opening browser session");
            self.session = Some(self.factory.open().await?);
        }
        Ok(())
    }

    async fn discover_query(
        &mut self,
        query: &Query,
    ) -> Result<(DiscoveryReport, Vec<ImageReference>), ScrapeError> {
        let result = self.navigate_discover_extract(query).await;
        if let Err(ScrapeError::SessionUnavailable(reason)) = &result {
            scrape_warn!("dropping browser session after failure: {}", reason);
            self.close().await;
        }
        result
    }

    async fn navigate_discover_extract(
        &mut self,
        query: &Query,
    ) -> Result<(DiscoveryReport, Vec<ImageReference>), ScrapeError> {
        let url = query
            .results_url(&self.search)
            .map_err(|err| ScrapeError::InvalidSearchUrl(err.to_string()))?;
        let Some(session) = self.session.as_deref_mut() else {
            return Err(ScrapeError::SessionUnavailable("no open session".into()));
        };

        scrape_info!("query=\"{}\" loading {}", query, url);
        session.navigate(url.as_str()).await?;
        let discovery = self
            .discovery
            .run(&mut *session, query, self.sink.as_ref())
            .await?;
        let fresh = self
            .extractor
            .extract(&*session, query, &self.references)
            .await?;

        let added = self.references.merge(fresh);
        scrape_info!(
            "query=\"{}\" new references: {} (total {})",
            query,
            added.len(),
            self.references.len()
        );
        self.sink.emit(EngineEvent::QueryFinished {
            query: query.clone(),
            new_references: added.len(),
        });
        Ok((discovery, added))
    }
}
