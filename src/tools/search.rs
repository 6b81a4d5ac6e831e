//! Internet search with per-result summaries.

use crate::contract::{CallerContext, FieldKind, FieldSpec, Tool, ToolResult, ToolSchema};
use crate::error::Result;
use crate::search::{Region, SearchAdapter, SearchResult, TimeWindow};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    pub country: Region,
    pub time_limit: TimeWindow,
}

/// Web search with per-hit summaries.
pub struct InternetSearchTool {
    adapter: Arc<SearchAdapter>,
}

impl InternetSearchTool {
    pub fn new(adapter: Arc<SearchAdapter>) -> Self {
        Self { adapter }
    }
}

fn digest(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{}'.", query);
    }

    let mut out = format!("Found {} results for '{}':\n\n", results.len(), query);
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} ({})\n{}\n\n",
            i + 1,
            result.source_name,
            result.source_link,
            result.content
        ));
    }
    out.trim_end().to_string()
}

#[async_trait]
impl Tool for InternetSearchTool {
    type Args = SearchArgs;

    fn name(&self) -> &'static str {
        "internet_search"
    }

    fn description(&self) -> &'static str {
        "Search the internet for information."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            FieldSpec::required(
                "query",
                FieldKind::String,
                "The query to search for on the internet.",
            )
            .non_empty(),
            FieldSpec::required(
                "country",
                FieldKind::String,
                "The country code for the search: jp-jp (Japan), kr-kr (Korea), cn-zh (China), \
                 fr-fr (France), de-de (Germany), es-es (Spain), it-it (Italy), us-en (United States).",
            )
            .one_of(Region::codes()),
            FieldSpec::required(
                "time_limit",
                FieldKind::String,
                "The time limit for the search: 'd' (day), 'w' (week), 'm' (month), 'y' (year).",
            )
            .one_of(["d", "w", "m", "y"]),
        ])
    }

    fn bot_scoped(&self) -> bool {
        true
    }

    async fn run(&self, args: SearchArgs, caller: &CallerContext) -> Result<ToolResult> {
        let results = self
            .adapter
            .search(&args.query, args.country, args.time_limit, caller)
            .await?;
        info!("Internet search returned {} summarized results", results.len());

        Ok(ToolResult::text(digest(&args.query, &results), "internet_search").with_sources(results))
    }
}

#[cfg(test)]
mod tests {
    use crate::contract::{BotConfig, CallerContext, ToolRequest};
    use crate::error::ToolError;
    use crate::tools::tests::harness;
    use serde_json::json;

    fn researcher() -> CallerContext {
        CallerContext::for_bot(BotConfig {
            id: "researcher".to_string(),
            tools: vec!["internet_search".to_string()],
            internet: None,
        })
    }

    #[tokio::test]
    async fn test_search_returns_digest_and_sources() {
        let h = harness();
        let request = ToolRequest::new(
            "internet_search",
            json!({"query": "tokio", "country": "de-de", "time_limit": "w"}),
        )
        .with_caller(researcher());

        let result = h.registry.invoke(request).await.unwrap();
        assert_eq!(result.sources.len(), 2);
        assert!(result.content.starts_with("Found 2 results for 'tokio'"));
        assert!(result.content.contains("1. duckduckgo result 0 (https://duckduckgo.test/0)"));
        assert!(result.content.contains("gist"));
        assert!(result.source_link.is_none());
        assert_eq!(h.backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_country_never_reaches_backend() {
        let h = harness();
        let request = ToolRequest::new(
            "internet_search",
            json!({"query": "tokio", "country": "xx-xx", "time_limit": "w"}),
        )
        .with_caller(researcher());

        let err = h.registry.invoke(request).await.unwrap_err();
        match err {
            ToolError::InvalidArgument { field, .. } => assert_eq!(field, "country"),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
        assert_eq!(h.backend.call_count(), 0);
    }

    #[test]
    fn test_empty_digest() {
        assert_eq!(super::digest("nothing", &[]), "No results found for 'nothing'.");
    }
}
