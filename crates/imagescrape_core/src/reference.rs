use std::collections::BTreeMap;

use crate::Query;

/// One discoverable image: its source URL and the query that found it.
/// The URL is the identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub url: String,
    pub query: Query,
}

impl ImageReference {
    pub fn new(url: impl Into<String>, query: Query) -> Self {
        Self {
            url: url.into(),
            query,
        }
    }
}

/// Append-only, URL-keyed collection of references accumulated over a run.
///
/// The first query to discover a URL keeps ownership of it; later sightings
/// are dropped. Iteration is ordered by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    entries: BTreeMap<String, ImageReference>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&ImageReference> {
        self.entries.get(url)
    }

    /// Insert a single reference. Returns `false` if the URL was already known.
    pub fn insert(&mut self, reference: ImageReference) -> bool {
        if self.entries.contains_key(&reference.url) {
            return false;
        }
        self.entries.insert(reference.url.clone(), reference);
        true
    }

    /// Merge a batch and return exactly the references that were new.
    pub fn merge<I>(&mut self, references: I) -> Vec<ImageReference>
    where
        I: IntoIterator<Item = ImageReference>,
    {
        let mut added = Vec::new();
        for reference in references {
            if self.insert(reference.clone()) {
                added.push(reference);
            }
        }
        added
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageReference> {
        self.entries.values()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of references attributed to `query`.
    pub fn count_for(&self, query: &Query) -> usize {
        self.entries.values().filter(|r| &r.query == query).count()
    }
}

impl<'a> IntoIterator for &'a ReferenceSet {
    type Item = &'a ImageReference;
    type IntoIter = std::collections::btree_map::Values<'a, String, ImageReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl FromIterator<ImageReference> for ReferenceSet {
    fn from_iter<T: IntoIterator<Item = ImageReference>>(iter: T) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}
