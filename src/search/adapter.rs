//! Backend selection and mandatory summarization of hits.

use super::{DuckDuckGoBackend, FirecrawlBackend, Region, SearchBackend, SearchResult, TimeWindow};
use crate::config::SearchSettings;
use crate::contract::{CallerContext, FirecrawlConfig};
use crate::error::{Result, ToolError};
use crate::summarize::Summarizer;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Search engine named in a bot configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    DuckDuckGo,
    Firecrawl,
    /// Anything else; treated as the default engine.
    Unrecognized(String),
}

impl Engine {
    /// Match a configured engine key, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "duckduckgo" => Engine::DuckDuckGo,
            "firecrawl" => Engine::Firecrawl,
            _ => Engine::Unrecognized(name.to_string()),
        }
    }
}

/// Builds a Firecrawl backend from a bot's credentials.
pub type FirecrawlFactory = Arc<dyn Fn(&FirecrawlConfig) -> Arc<dyn SearchBackend> + Send + Sync>;

/// Runs searches for callers, choosing the backend from their configuration.
pub struct SearchAdapter {
    default_backend: Arc<dyn SearchBackend>,
    default_max_results: usize,
    firecrawl: FirecrawlFactory,
    summarizer: Arc<Summarizer>,
    concurrency: usize,
}

impl SearchAdapter {
    pub fn new(
        default_backend: Arc<dyn SearchBackend>,
        firecrawl: FirecrawlFactory,
        summarizer: Arc<Summarizer>,
    ) -> Self {
        Self {
            default_backend,
            default_max_results: 20,
            firecrawl,
            summarizer,
            concurrency: 4,
        }
    }

    /// DuckDuckGo by default, Firecrawl for bots that ask for it.
    pub fn from_settings(settings: &SearchSettings, summarizer: Arc<Summarizer>) -> Self {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let default_backend = Arc::new(DuckDuckGoBackend::new(
            &settings.duckduckgo_url,
            &settings.safe_search,
            timeout,
        ));

        let firecrawl_url = settings.firecrawl_url.clone();
        let firecrawl: FirecrawlFactory = Arc::new(move |config: &FirecrawlConfig| {
            Arc::new(FirecrawlBackend::new(&firecrawl_url, &config.api_key, timeout))
                as Arc<dyn SearchBackend>
        });

        Self::new(default_backend, firecrawl, summarizer)
            .with_default_max_results(settings.duckduckgo_max_results)
            .with_concurrency(settings.summary_concurrency)
    }

    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = max_results;
        self
    }

    /// Number of hits summarized at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn default_choice(&self) -> (Arc<dyn SearchBackend>, usize) {
        (self.default_backend.clone(), self.default_max_results)
    }

    /// Choose the backend and result cap for `caller`.
    ///
    /// A known engine with missing credentials is a configuration error. An
    /// engine name nobody recognizes falls back to the default backend.
    pub fn select(&self, caller: &CallerContext) -> Result<(Arc<dyn SearchBackend>, usize)> {
        let Some(bot) = &caller.bot else {
            warn!("No bot configuration, using the default search backend");
            return Ok(self.default_choice());
        };

        let Some(internet) = &bot.internet else {
            info!("Bot {} has no internet tool configuration", bot.id);
            return Ok(self.default_choice());
        };

        match Engine::parse(&internet.search_engine) {
            Engine::DuckDuckGo => Ok(self.default_choice()),
            Engine::Firecrawl => {
                let config = internet.firecrawl.as_ref().ok_or_else(|| {
                    ToolError::Configuration(format!(
                        "Firecrawl configuration is not set for bot '{}'",
                        bot.id
                    ))
                })?;
                if config.api_key.trim().is_empty() {
                    return Err(ToolError::Configuration(format!(
                        "Firecrawl API key is empty for bot '{}'",
                        bot.id
                    )));
                }
                Ok(((self.firecrawl)(config), config.max_results))
            }
            Engine::Unrecognized(name) => {
                warn!(
                    "Unexpected search engine '{}', falling back to the default backend",
                    name
                );
                Ok(self.default_choice())
            }
        }
    }

    /// Search and summarize every hit, preserving backend order.
    #[instrument(skip(self, caller), fields(region = %region))]
    pub async fn search(
        &self,
        query: &str,
        region: Region,
        window: TimeWindow,
        caller: &CallerContext,
    ) -> Result<Vec<SearchResult>> {
        let (backend, max_results) = self.select(caller)?;
        info!("Searching with {} (max {} results)", backend.name(), max_results);

        let hits = backend.search(query, region, window, max_results).await?;
        info!("{} returned {} results", backend.name(), hits.len());

        let summarizer = &self.summarizer;
        let results = stream::iter(hits)
            .map(move |hit| async move {
                let content = summarizer
                    .summarize(&hit.body, &hit.title, &hit.url, query)
                    .await;
                SearchResult {
                    content,
                    source_name: hit.title,
                    source_link: hit.url,
                }
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::contract::{BotConfig, InternetToolConfig};
    use crate::search::RawSearchHit;
    use crate::summarize::tests::ScriptedModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend returning fixed hits and recording its calls.
    pub(crate) struct FixedBackend {
        pub label: &'static str,
        pub hits: Vec<RawSearchHit>,
        pub calls: Mutex<Vec<(String, Region, TimeWindow, usize)>>,
    }

    impl FixedBackend {
        pub fn new(label: &'static str, count: usize) -> Self {
            let hits = (0..count)
                .map(|i| RawSearchHit {
                    title: format!("{} result {}", label, i),
                    url: format!("https://{}.test/{}", label, i),
                    body: format!("body {} ", i).repeat(300),
                })
                .collect();
            Self {
                label,
                hits,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SearchBackend for FixedBackend {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn search(
            &self,
            query: &str,
            region: Region,
            window: TimeWindow,
            max_results: usize,
        ) -> Result<Vec<RawSearchHit>> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), region, window, max_results));
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }
    }

    struct Fixture {
        adapter: SearchAdapter,
        default_backend: Arc<FixedBackend>,
        firecrawl_backend: Arc<FixedBackend>,
        factory_calls: Arc<AtomicUsize>,
        model: Arc<ScriptedModel>,
    }

    fn fixture() -> Fixture {
        let default_backend = Arc::new(FixedBackend::new("duckduckgo", 3));
        let firecrawl_backend = Arc::new(FixedBackend::new("firecrawl", 5));
        let factory_calls = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(ScriptedModel::replying("summary"));

        let fc = firecrawl_backend.clone();
        let calls = factory_calls.clone();
        let factory: FirecrawlFactory = Arc::new(move |_config: &FirecrawlConfig| {
            calls.fetch_add(1, Ordering::SeqCst);
            fc.clone() as Arc<dyn SearchBackend>
        });

        let adapter = SearchAdapter::new(
            default_backend.clone(),
            factory,
            Arc::new(Summarizer::new(model.clone())),
        );

        Fixture {
            adapter,
            default_backend,
            firecrawl_backend,
            factory_calls,
            model,
        }
    }

    fn bot(engine: &str, firecrawl: Option<FirecrawlConfig>) -> CallerContext {
        CallerContext::for_bot(BotConfig {
            id: "bot-1".to_string(),
            tools: vec!["internet_search".to_string()],
            internet: Some(InternetToolConfig {
                search_engine: engine.to_string(),
                firecrawl,
            }),
        })
    }

    #[tokio::test]
    async fn test_plain_chat_uses_default_backend() {
        let f = fixture();
        let results = f
            .adapter
            .search("rust", Region::UnitedStates, TimeWindow::Week, &CallerContext::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(f.default_backend.call_count(), 1);
        let calls = f.default_backend.calls.lock().unwrap();
        assert_eq!(calls[0], ("rust".to_string(), Region::UnitedStates, TimeWindow::Week, 20));
    }

    #[tokio::test]
    async fn test_every_hit_is_summarized_in_order() {
        let f = fixture();
        let results = f
            .adapter
            .search("q", Region::Japan, TimeWindow::Day, &bot("duckduckgo", None))
            .await
            .unwrap();

        assert_eq!(f.model.prompts.lock().unwrap().len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.content, "summary");
            assert_eq!(result.source_name, format!("duckduckgo result {}", i));
            assert_eq!(result.source_link, format!("https://duckduckgo.test/{}", i));
        }
    }

    #[tokio::test]
    async fn test_unrecognized_engine_falls_back() {
        let f = fixture();
        let results = f
            .adapter
            .search("q", Region::Germany, TimeWindow::Month, &bot("altavista", None))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(f.default_backend.call_count(), 1);
        assert_eq!(f.factory_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_firecrawl_with_credentials() {
        let f = fixture();
        let config = FirecrawlConfig {
            api_key: "fc-key".to_string(),
            max_results: 2,
        };
        let results = f
            .adapter
            .search("q", Region::France, TimeWindow::Year, &bot("firecrawl", Some(config)))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(f.factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.firecrawl_backend.call_count(), 1);
        assert_eq!(f.default_backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_firecrawl_without_credentials_is_configuration_error() {
        let f = fixture();

        let missing_key = FirecrawlConfig {
            api_key: "  ".to_string(),
            max_results: 10,
        };
        for caller in [bot("firecrawl", Some(missing_key)), bot("firecrawl", None)] {
            let err = f
                .adapter
                .search("q", Region::Italy, TimeWindow::Day, &caller)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "configuration_error");
        }

        assert_eq!(f.factory_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.firecrawl_backend.call_count(), 0);
        assert_eq!(f.default_backend.call_count(), 0);
        assert!(f.model.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_engine_parsing() {
        assert_eq!(Engine::parse("duckduckgo"), Engine::DuckDuckGo);
        assert_eq!(Engine::parse(" Firecrawl "), Engine::Firecrawl);
        assert_eq!(
            Engine::parse("bing"),
            Engine::Unrecognized("bing".to_string())
        );
    }
}
