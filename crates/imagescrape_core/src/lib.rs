//! Imagescrape core: data model and pure discovery decisions.
mod discovery;
mod query;
mod reference;

pub use discovery::{
    DiscoverySettings, DiscoveryStep, DiscoveryTracker, SettingsError, MAX_SETTLE_DELAY,
    MIN_NO_GROWTH_THRESHOLD,
};
pub use query::{Query, QueryError, SearchSettings};
pub use reference::{ImageReference, ReferenceSet};
