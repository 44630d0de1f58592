use std::time::Duration;

/// Smallest accepted no-growth threshold.
pub const MIN_NO_GROWTH_THRESHOLD: u32 = 2;
/// Upper bound on the settle wait between a scroll and the next measurement.
pub const MAX_SETTLE_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Wait after each scroll before measuring the extent again.
    pub settle_delay: Duration,
    /// Consecutive iterations without growth that mark the page exhausted.
    pub no_growth_threshold: u32,
    /// Hard stop regardless of growth.
    pub max_iterations: u32,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            no_growth_threshold: MIN_NO_GROWTH_THRESHOLD,
            max_iterations: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("no-growth threshold must be at least 2, got {0}")]
    NoGrowthThresholdTooLow(u32),
    #[error("iteration ceiling must be at least 1")]
    ZeroIterationCeiling,
    #[error("settle delay {actual:?} exceeds the maximum of {max:?}")]
    SettleDelayTooLong { actual: Duration, max: Duration },
}

impl DiscoverySettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.no_growth_threshold < MIN_NO_GROWTH_THRESHOLD {
            return Err(SettingsError::NoGrowthThresholdTooLow(
                self.no_growth_threshold,
            ));
        }
        if self.max_iterations == 0 {
            return Err(SettingsError::ZeroIterationCeiling);
        }
        if self.settle_delay > MAX_SETTLE_DELAY {
            return Err(SettingsError::SettleDelayTooLong {
                actual: self.settle_delay,
                max: MAX_SETTLE_DELAY,
            });
        }
        Ok(())
    }
}

/// Decision after one scroll/measure iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStep {
    Continue,
    /// Extent stayed flat for the configured number of iterations.
    Exhausted,
    /// The iteration ceiling was hit while the page was still changing.
    CeilingReached,
}

/// Per-query no-growth bookkeeping for the scroll loop.
///
/// Growth is judged against the highest extent seen so far, so a page that
/// shrinks and regrows to an old height does not count as progress.
#[derive(Debug, Clone)]
pub struct DiscoveryTracker {
    no_growth_threshold: u32,
    max_iterations: u32,
    iterations: u32,
    stalled: u32,
    peak: Option<u64>,
}

impl DiscoveryTracker {
    pub fn new(settings: &DiscoverySettings) -> Self {
        Self {
            no_growth_threshold: settings.no_growth_threshold.max(MIN_NO_GROWTH_THRESHOLD),
            max_iterations: settings.max_iterations.max(1),
            iterations: 0,
            stalled: 0,
            peak: None,
        }
    }

    /// Record the extent measured before and after one scroll.
    pub fn observe(&mut self, before: u64, after: u64) -> DiscoveryStep {
        self.iterations += 1;
        let peak = self.peak.map_or(before, |p| p.max(before));
        if after > peak {
            self.peak = Some(after);
            self.stalled = 0;
        } else {
            self.peak = Some(peak);
            self.stalled += 1;
        }

        if self.stalled >= self.no_growth_threshold {
            DiscoveryStep::Exhausted
        } else if self.iterations >= self.max_iterations {
            DiscoveryStep::CeilingReached
        } else {
            DiscoveryStep::Continue
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn peak_extent(&self) -> u64 {
        self.peak.unwrap_or(0)
    }

    pub fn stalled(&self) -> u32 {
        self.stalled
    }
}
