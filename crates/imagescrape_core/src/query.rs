use std::fmt;

use url::Url;

/// Where the image results surface lives and which parameters select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub base_url: String,
    /// Appended after `q=<query>`, in order.
    pub extra_params: Vec<(String, String)>,
}

impl Default for SearchSettings {
    /// Global Google host; regional hosts such as google.co.in serve the same image results page.
    fn default() -> Self {
        Self {
            base_url: "https://www.google.com/search".to_string(),
            extra_params: vec![
                ("source".to_string(), "lnms".to_string()),
                ("tbm".to_string(), "isch".to_string()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query is empty")]
    Empty,
    #[error("invalid search base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
}

/// A trimmed, non-empty search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Query(String);

impl Query {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, QueryError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Results-surface URL for this query.
    pub fn results_url(&self, search: &SearchSettings) -> Result<Url, QueryError> {
        let mut url = Url::parse(&search.base_url).map_err(|err| QueryError::InvalidBaseUrl {
            url: search.base_url.clone(),
            message: err.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", &self.0);
            for (key, value) in &search.extra_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
