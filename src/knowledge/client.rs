//! Blocking HTTP client for Wikidata and Wikipedia.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{QueryResponse, SearchCandidate, SearchResponse, SummaryResponse};
use super::{KnowledgeBase, KnowledgeError};

pub const DEFAULT_WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_WIKIPEDIA_REST_URL: &str = "https://en.wikipedia.org/api/rest_v1";
pub const DEFAULT_WIKIDATA_API_URL: &str = "https://www.wikidata.org/w/api.php";

/// Wikimedia asks API clients to identify themselves.
const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (entity linking and fact checking)"
);

/// Builder for `WikiClient`.
///
/// # Examples
///
/// ```
/// use qafact::knowledge::WikiClientBuilder;
///
/// let client = WikiClientBuilder::new()
///     .wikipedia_api_url("http://localhost:8080/w/api.php")
///     .build()
///     .expect("Failed to create client");
/// ```
#[derive(Debug, Default)]
pub struct WikiClientBuilder {
    wikipedia_api_url: Option<String>,
    wikipedia_rest_url: Option<String>,
    wikidata_api_url: Option<String>,
    timeout: Option<Duration>,
}

impl WikiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wikipedia action API endpoint (`.../w/api.php`).
    pub fn wikipedia_api_url(mut self, url: impl Into<String>) -> Self {
        self.wikipedia_api_url = Some(url.into());
        self
    }

    /// Wikipedia REST API root (`.../api/rest_v1`).
    pub fn wikipedia_rest_url(mut self, url: impl Into<String>) -> Self {
        self.wikipedia_rest_url = Some(url.into());
        self
    }

    /// Wikidata action API endpoint (`.../w/api.php`).
    pub fn wikidata_api_url(mut self, url: impl Into<String>) -> Self {
        self.wikidata_api_url = Some(url.into());
        self
    }

    /// Overall request timeout. Without one the HTTP library default applies.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates the endpoints and builds the client.
    pub fn build(self) -> Result<WikiClient, KnowledgeError> {
        let wikipedia_api = parse_url(
            self.wikipedia_api_url
                .as_deref()
                .unwrap_or(DEFAULT_WIKIPEDIA_API_URL),
        )?;
        let wikipedia_rest = parse_url(
            self.wikipedia_rest_url
                .as_deref()
                .unwrap_or(DEFAULT_WIKIPEDIA_REST_URL),
        )?;
        let wikidata_api = parse_url(
            self.wikidata_api_url
                .as_deref()
                .unwrap_or(DEFAULT_WIKIDATA_API_URL),
        )?;

        if wikipedia_rest.cannot_be_a_base() {
            return Err(KnowledgeError::InvalidUrl(format!(
                "{wikipedia_rest}: cannot be used as a base URL"
            )));
        }

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(KnowledgeError::Network)?;

        Ok(WikiClient {
            http,
            wikipedia_api,
            wikipedia_rest,
            wikidata_api,
        })
    }
}

fn parse_url(url: &str) -> Result<Url, KnowledgeError> {
    Url::parse(url).map_err(|e| KnowledgeError::InvalidUrl(format!("{url}: {e}")))
}

/// Synchronous client for the Wikimedia APIs used in entity linking.
pub struct WikiClient {
    http: Client,
    wikipedia_api: Url,
    wikipedia_rest: Url,
    wikidata_api: Url,
}

impl WikiClient {
    pub fn wikipedia_api_url(&self) -> &str {
        self.wikipedia_api.as_str()
    }

    pub fn wikipedia_rest_url(&self) -> &str {
        self.wikipedia_rest.as_str()
    }

    pub fn wikidata_api_url(&self) -> &str {
        self.wikidata_api.as_str()
    }

    /// URL of the REST summary for `title`. Spaces become underscores, the rest is
    /// percent-encoded as a single path segment.
    fn summary_url(&self, title: &str) -> Url {
        let mut url = self.wikipedia_rest.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("page")
                .push("summary")
                .push(&title.replace(' ', "_"));
        }
        url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, KnowledgeError> {
        debug!(url = %url, ?query, "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(KnowledgeError::Network)?;
        decode(check_status(response)?)
    }
}

fn check_status(response: Response) -> Result<Response, KnowledgeError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(KnowledgeError::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, KnowledgeError> {
    let url = response.url().to_string();
    let body = response.text().map_err(KnowledgeError::Network)?;
    serde_json::from_str(&body).map_err(|e| KnowledgeError::Decode {
        url,
        message: e.to_string(),
    })
}

impl KnowledgeBase for WikiClient {
    fn search_entities(&self, name: &str) -> Result<Vec<SearchCandidate>, KnowledgeError> {
        let response: SearchResponse = self.get_json(
            self.wikidata_api.clone(),
            &[
                ("action", "wbsearchentities"),
                ("format", "json"),
                ("language", "en"),
                ("search", name),
            ],
        )?;
        Ok(response.search)
    }

    fn page_url(&self, title: &str) -> Result<Option<String>, KnowledgeError> {
        let response: QueryResponse = self.get_json(
            self.wikipedia_api.clone(),
            &[
                ("action", "query"),
                ("format", "json"),
                ("titles", title),
                ("prop", "info"),
                ("inprop", "url"),
            ],
        )?;
        Ok(response.first_page_url())
    }

    fn page_summary(&self, title: &str) -> Result<String, KnowledgeError> {
        let response: SummaryResponse = self.get_json(self.summary_url(title), &[])?;
        Ok(response.extract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_uses_wikimedia_defaults() {
        let client = WikiClientBuilder::new().build().unwrap();
        assert_eq!(client.wikipedia_api_url(), DEFAULT_WIKIPEDIA_API_URL);
        assert_eq!(client.wikipedia_rest_url(), DEFAULT_WIKIPEDIA_REST_URL);
        assert_eq!(client.wikidata_api_url(), DEFAULT_WIKIDATA_API_URL);
    }

    #[test]
    fn build_rejects_invalid_url() {
        let result = WikiClientBuilder::new()
            .wikidata_api_url("not a url")
            .build();
        assert!(matches!(result, Err(KnowledgeError::InvalidUrl(_))));
    }

    #[test]
    fn build_rejects_rest_url_that_cannot_be_a_base() {
        let result = WikiClientBuilder::new()
            .wikipedia_rest_url("mailto:someone@example.com")
            .build();
        assert!(matches!(result, Err(KnowledgeError::InvalidUrl(_))));
    }

    #[test]
    fn summary_url_encodes_title_as_one_segment() {
        let client = WikiClientBuilder::new().build().unwrap();

        assert_eq!(
            client.summary_url("Pulp Fiction").as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Pulp_Fiction"
        );
        assert_eq!(
            client.summary_url("AC/DC").as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/AC%2FDC"
        );
    }

    #[test]
    fn summary_url_tolerates_trailing_slash_in_base() {
        let client = WikiClientBuilder::new()
            .wikipedia_rest_url("http://localhost:8080/api/rest_v1/")
            .build()
            .unwrap();
        assert_eq!(
            client.summary_url("Apple").as_str(),
            "http://localhost:8080/api/rest_v1/page/summary/Apple"
        );
    }

    #[test]
    fn user_agent_identifies_crate() {
        assert!(USER_AGENT.starts_with("qafact/"));
    }

    #[test]
    fn http_error_display_includes_status_and_url() {
        let err = KnowledgeError::Http {
            status: 503,
            url: "https://www.wikidata.org/w/api.php".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error: status 503 from https://www.wikidata.org/w/api.php"
        );
    }
}
