use imagescrape_core::{DiscoverySettings, DiscoveryStep, DiscoveryTracker, Query};
use scrape_logging::{scrape_debug, scrape_info, scrape_warn};

use crate::fetch::ProgressSink;
use crate::session::{BrowserSession, SessionError};
use crate::{DiscoveryEnd, DiscoveryReport, EngineEvent};

/// Scrolls a results surface until the loaded extent stops growing.
#[derive(Debug, Clone, Default)]
pub struct ScrollDiscoveryEngine {
    settings: DiscoverySettings,
}

impl ScrollDiscoveryEngine {
    pub fn new(settings: DiscoverySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Run the scroll/settle/measure loop on an already navigated session.
    ///
    /// Every iteration waits at most `settle_delay`, and the loop never runs
    /// more than `max_iterations` times.
    pub async fn run(
        &self,
        session: &mut dyn BrowserSession,
        query: &Query,
        sink: &dyn ProgressSink,
    ) -> Result<DiscoveryReport, SessionError> {
        let mut tracker = DiscoveryTracker::new(&self.settings);

        loop {
            let before = session.current_extent().await?;
            session.scroll_to(before).await?;
            tokio::time::sleep(self.settings.settle_delay).await;
            let after = session.current_extent().await?;

            let step = tracker.observe(before, after);
            scrape_debug!(
                "query=\"{}\" scroll={} height {} -> {} stalled={}",
                query,
                tracker.iterations(),
                before,
                after,
                tracker.stalled()
            );
            sink.emit(EngineEvent::DiscoveryTick {
                query: query.clone(),
                iteration: tracker.iterations(),
                extent: after,
            });

            let end = match step {
                DiscoveryStep::Continue => continue,
                DiscoveryStep::Exhausted => DiscoveryEnd::Exhausted,
                DiscoveryStep::CeilingReached => {
                    scrape_warn!(
                        "query=\"{}\" still growing after {} scrolls; stopping at ceiling",
                        query,
                        tracker.iterations()
                    );
                    DiscoveryEnd::CeilingReached
                }
            };

            scrape_info!(
                "query=\"{}\" discovery finished after {} scrolls at height {}",
                query,
                tracker.iterations(),
                tracker.peak_extent()
            );
            return Ok(DiscoveryReport {
                iterations: tracker.iterations(),
                final_extent: tracker.peak_extent(),
                end,
            });
        }
    }
}
