//! Wire types for the Wikidata and Wikipedia APIs.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One entity returned by Wikidata's `wbsearchentities`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchCandidate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl SearchCandidate {
    pub fn new(label: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            id: String::new(),
            label: label.into(),
            description: description.map(str::to_string),
        }
    }

    /// Description text, empty when the entity has none.
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub search: Vec<SearchCandidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryPages {
    #[serde(default)]
    pub pages: BTreeMap<String, PageInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageInfo {
    #[serde(default)]
    pub fullurl: Option<String>,
}

/// Page id Wikipedia uses for titles that do not exist.
pub(crate) const MISSING_PAGE_ID: &str = "-1";

impl QueryResponse {
    /// URL of the first existing page in the response.
    pub fn first_page_url(self) -> Option<String> {
        self.query?
            .pages
            .into_iter()
            .find(|(id, _)| id != MISSING_PAGE_ID)
            .and_then(|(_, page)| page.fullurl)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryResponse {
    #[serde(default)]
    pub extract: String,
}
