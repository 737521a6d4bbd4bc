//! Clients for the reference knowledge sources.
//!
//! Wikidata supplies candidate entities for disambiguation; Wikipedia supplies
//! canonical page URLs and page summaries. `KnowledgeBase` is the seam the
//! linker and fact checker depend on, so both can run against fixtures.

mod client;
mod types;

pub use client::{
    DEFAULT_WIKIDATA_API_URL, DEFAULT_WIKIPEDIA_API_URL, DEFAULT_WIKIPEDIA_REST_URL, WikiClient,
    WikiClientBuilder,
};
pub use types::SearchCandidate;

use thiserror::Error;

/// Failure of a single knowledge-base call.
///
/// Callers log these and carry on with degraded information.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Connection, DNS or timeout failure
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP error: status {status} from {url}")]
    Http { status: u16, url: String },

    /// Response body was not the expected JSON
    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Endpoint configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Read-only access to entity search, page lookup and page summaries.
pub trait KnowledgeBase {
    /// Searches entities whose label matches `name`, in the source's ranking order.
    fn search_entities(&self, name: &str) -> Result<Vec<SearchCandidate>, KnowledgeError>;

    /// Returns the full URL of the page titled `title`, or `None` if no such page exists.
    fn page_url(&self, title: &str) -> Result<Option<String>, KnowledgeError>;

    /// Returns the plain-text summary of the page titled `title` (empty if it has none).
    fn page_summary(&self, title: &str) -> Result<String, KnowledgeError>;
}
