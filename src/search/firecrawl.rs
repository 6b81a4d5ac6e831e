//! Firecrawl search API backend.

use super::{RawSearchHit, Region, SearchBackend, TimeWindow};
use crate::error::{Result, ToolError};
use crate::openai::http_client;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Firecrawl `/search` with markdown scraping of each hit.
pub struct FirecrawlBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Vec<SearchData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<SearchMetadata>,
}

#[derive(Debug, Deserialize)]
struct SearchMetadata {
    #[serde(default, rename = "sourceURL")]
    source_url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl SearchData {
    fn into_hit(self) -> RawSearchHit {
        let metadata = self.metadata;
        let title = self
            .title
            .or_else(|| metadata.as_ref().and_then(|m| m.title.clone()))
            .unwrap_or_default();
        let url = metadata
            .and_then(|m| m.source_url)
            .or(self.url)
            .unwrap_or_default();
        let body = self
            .markdown
            .filter(|m| !m.trim().is_empty())
            .or(self.description)
            .unwrap_or_default();

        RawSearchHit { title, url, body }
    }
}

impl FirecrawlBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl SearchBackend for FirecrawlBackend {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    #[instrument(skip(self), fields(region = %region))]
    async fn search(
        &self,
        query: &str,
        region: Region,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<RawSearchHit>> {
        info!("Searching with Firecrawl: {} (max {} results)", query, max_results);

        let body = json!({
            "query": query,
            "limit": max_results,
            "lang": region.language(),
            "country": region.code(),
            "tbs": format!("qdr:{}", window.code()),
            "scrapeOptions": {
                "formats": ["markdown"],
                "onlyMainContent": true,
            },
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ToolError::Provider(format!(
                "Firecrawl returned HTTP {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        if parsed.success == Some(false) {
            return Err(ToolError::Provider(format!(
                "Firecrawl search failed: {}",
                parsed.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        if parsed.data.is_empty() {
            warn!("No results found");
        }

        let hits: Vec<RawSearchHit> = parsed
            .data
            .into_iter()
            .map(SearchData::into_hit)
            .take(max_results)
            .collect();
        info!("Found {} results from Firecrawl", hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_search_maps_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/search")
            .match_header("authorization", "Bearer fc-test")
            .match_body(Matcher::PartialJson(json!({
                "query": "tokio runtime",
                "limit": 3,
                "lang": "de",
                "tbs": "qdr:m",
                "scrapeOptions": {"formats": ["markdown"]},
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "data": [
                        {
                            "title": "Tokio",
                            "url": "https://tokio.rs",
                            "markdown": "# Tokio\nAn async runtime.",
                            "metadata": {"sourceURL": "https://tokio.rs/", "title": "Tokio - home"}
                        },
                        {
                            "url": "https://docs.rs/tokio",
                            "description": "API docs",
                            "markdown": "   ",
                            "metadata": {"title": "tokio - Rust"}
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let backend = FirecrawlBackend::new(
            &format!("{}/v1/", server.url()),
            "fc-test",
            Duration::from_secs(5),
        );
        let hits = backend
            .search("tokio runtime", Region::Germany, TimeWindow::Month, 3)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Tokio");
        assert_eq!(hits[0].url, "https://tokio.rs/");
        assert!(hits[0].body.contains("async runtime"));
        assert_eq!(hits[1].title, "tokio - Rust");
        assert_eq!(hits[1].url, "https://docs.rs/tokio");
        assert_eq!(hits[1].body, "API docs");
    }

    #[tokio::test]
    async fn test_unauthorized_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(401)
            .with_body(r#"{"error":"Unauthorized"}"#)
            .create_async()
            .await;

        let backend = FirecrawlBackend::new(&server.url(), "bad", Duration::from_secs(5));
        let err = backend
            .search("q", Region::UnitedStates, TimeWindow::Day, 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
