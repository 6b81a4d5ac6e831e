//! DuckDuckGo HTML endpoint backend.

use super::{RawSearchHit, Region, SearchBackend, TimeWindow};
use crate::error::{Result, ToolError};
use crate::openai::http_client;
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// DuckDuckGo search, scraped from the no-script HTML endpoint.
pub struct DuckDuckGoBackend {
    client: reqwest::Client,
    endpoint: String,
    safe_search: String,
    result_selector: Selector,
    link_selector: Selector,
    snippet_selector: Selector,
}

impl DuckDuckGoBackend {
    pub fn new(endpoint: &str, safe_search: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            endpoint: endpoint.to_string(),
            safe_search: safe_search.to_string(),
            result_selector: Selector::parse(".result").expect("Invalid selector"),
            link_selector: Selector::parse("a.result__a").expect("Invalid selector"),
            snippet_selector: Selector::parse(".result__snippet").expect("Invalid selector"),
        }
    }

    /// The `kp` parameter for the configured safe search level.
    fn safe_search_param(&self) -> &'static str {
        match self.safe_search.as_str() {
            "strict" => "1",
            "off" => "-2",
            _ => "-1",
        }
    }

    /// Parse result blocks out of the HTML page.
    ///
    /// Each `.result` block yields at most one hit; blocks without a usable
    /// link are skipped and a block without a snippet gets an empty body.
    fn parse_results(&self, html: &str, max_results: usize) -> Vec<RawSearchHit> {
        let doc = Html::parse_document(html);

        doc.select(&self.result_selector)
            .filter_map(|block| {
                let link = block.select(&self.link_selector).next()?;
                let url = resolve_redirect(link.value().attr("href")?)?;
                let body = block
                    .select(&self.snippet_selector)
                    .next()
                    .map(element_text)
                    .unwrap_or_default();
                Some(RawSearchHit {
                    title: element_text(link),
                    url,
                    body,
                })
            })
            .take(max_results)
            .collect()
    }
}

/// Text content with whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unwrap `//duckduckgo.com/l/?uddg=<target>` redirect links; skip ads.
fn resolve_redirect(href: &str) -> Option<String> {
    if href.contains("duckduckgo.com/y.js") {
        return None;
    }

    if let Some(idx) = href.find("uddg=") {
        let encoded = &href[idx + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        return percent_decode_str(encoded)
            .decode_utf8()
            .ok()
            .map(|s| s.into_owned());
    }

    if href.starts_with("//") {
        Some(format!("https:{}", href))
    } else if href.starts_with("http") {
        Some(href.to_string())
    } else {
        None
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    #[instrument(skip(self), fields(region = %region))]
    async fn search(
        &self,
        query: &str,
        region: Region,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<RawSearchHit>> {
        info!(
            "Executing DuckDuckGo search: {} (region {}, time limit {})",
            query,
            region,
            window.code()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::USER_AGENT, "Mozilla/5.0 (compatible; atelier)")
            .form(&[
                ("q", query),
                ("kl", region.code()),
                ("df", window.code()),
                ("kp", self.safe_search_param()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Provider(format!(
                "DuckDuckGo returned HTTP {}",
                status
            )));
        }

        let html = response.text().await?;
        let hits = self.parse_results(&html, max_results);
        debug!("Parsed {} DuckDuckGo results", hits.len());
        Ok(hits)
    }
}
