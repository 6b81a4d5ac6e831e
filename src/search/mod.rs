//! Web search over interchangeable backends.
//!
//! Backends return raw hits; [`SearchAdapter`] picks the backend for a caller
//! and passes every hit through the summarizer before returning it.

pub(crate) mod adapter;
mod duckduckgo;
mod firecrawl;

pub use adapter::{Engine, FirecrawlFactory, SearchAdapter};
pub use duckduckgo::DuckDuckGoBackend;
pub use firecrawl::FirecrawlBackend;

use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One summarized search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Summarized content, never the raw page text.
    pub content: String,
    /// Page title.
    pub source_name: String,
    /// Origin URL.
    pub source_link: String,
}

/// A hit as returned by a backend, before summarization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSearchHit {
    pub title: String,
    pub url: String,
    pub body: String,
}

/// Accepted locale codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "jp-jp")]
    Japan,
    #[serde(rename = "kr-kr")]
    Korea,
    #[serde(rename = "cn-zh")]
    China,
    #[serde(rename = "fr-fr")]
    France,
    #[serde(rename = "de-de")]
    Germany,
    #[serde(rename = "es-es")]
    Spain,
    #[serde(rename = "it-it")]
    Italy,
    #[serde(rename = "us-en")]
    UnitedStates,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::Japan,
        Region::Korea,
        Region::China,
        Region::France,
        Region::Germany,
        Region::Spain,
        Region::Italy,
        Region::UnitedStates,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Region::Japan => "jp-jp",
            Region::Korea => "kr-kr",
            Region::China => "cn-zh",
            Region::France => "fr-fr",
            Region::Germany => "de-de",
            Region::Spain => "es-es",
            Region::Italy => "it-it",
            Region::UnitedStates => "us-en",
        }
    }

    /// ISO 639-1 language of the locale.
    pub fn language(self) -> &'static str {
        match self {
            Region::Japan => "ja",
            Region::Korea => "ko",
            Region::China => "zh",
            Region::France => "fr",
            Region::Germany => "de",
            Region::Spain => "es",
            Region::Italy => "it",
            Region::UnitedStates => "en",
        }
    }

    pub fn codes() -> Vec<&'static str> {
        Self::ALL.iter().map(|r| r.code()).collect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.code() == s)
            .ok_or_else(|| {
                ToolError::invalid(
                    "country",
                    format!("must be one of: {}", Self::codes().join(", ")),
                )
            })
    }
}

/// Relative recency bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "m")]
    Month,
    #[serde(rename = "y")]
    Year,
}

impl TimeWindow {
    pub fn code(self) -> &'static str {
        match self {
            TimeWindow::Day => "d",
            TimeWindow::Week => "w",
            TimeWindow::Month => "m",
            TimeWindow::Year => "y",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "d" | "day" => Ok(TimeWindow::Day),
            "w" | "week" => Ok(TimeWindow::Week),
            "m" | "month" => Ok(TimeWindow::Month),
            "y" | "year" => Ok(TimeWindow::Year),
            _ => Err(ToolError::invalid("time_limit", "must be one of: d, w, m, y")),
        }
    }
}

/// A search provider.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        query: &str,
        region: Region,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<RawSearchHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_codes_roundtrip() {
        for region in Region::ALL {
            assert_eq!(region.code().parse::<Region>().unwrap(), region);
        }
        let err = "xx-xx".parse::<Region>().unwrap_err();
        assert!(err.to_string().contains("jp-jp"));
    }

    #[test]
    fn test_region_serde_uses_codes() {
        let region: Region = serde_json::from_str("\"us-en\"").unwrap();
        assert_eq!(region, Region::UnitedStates);
        assert_eq!(serde_json::to_string(&Region::China).unwrap(), "\"cn-zh\"");
    }

    #[test]
    fn test_time_window_parsing() {
        assert_eq!("w".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert_eq!("year".parse::<TimeWindow>().unwrap(), TimeWindow::Year);
        assert!("h".parse::<TimeWindow>().is_err());
    }
}
