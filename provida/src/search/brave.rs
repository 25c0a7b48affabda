//! Brave Search web API (general web search).

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CollaboratorError;
use crate::search::{SearchHit, SearchTool};

const BRAVE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";
/// Brave caps `count` at 20.
const COUNT_MAX: usize = 20;

fn brave_search_url() -> String {
    std::env::var("BRAVE_SEARCH_URL").unwrap_or_else(|_| BRAVE_SEARCH_URL.to_string())
}

#[derive(Deserialize, Default)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize, Default)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    extra_snippets: Vec<String>,
}

impl From<BraveResult> for SearchHit {
    fn from(r: BraveResult) -> Self {
        let content = (!r.extra_snippets.is_empty()).then(|| r.extra_snippets.join(" "));
        SearchHit {
            url: r.url,
            title: r.title,
            content,
            snippet: r.description,
        }
    }
}

/// General web search. The default tool of `SearchRouter`.
pub struct BraveSearch {
    client: reqwest::Client,
    api_key: String,
}

impl BraveSearch {
    pub const NAME: &'static str = "brave_search";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Reads `BRAVE_API_KEY`.
    pub fn from_env() -> Result<Self, CollaboratorError> {
        std::env::var("BRAVE_API_KEY")
            .map(Self::new)
            .map_err(|_| CollaboratorError::Search {
                tool: Self::NAME.into(),
                message: "BRAVE_API_KEY is not set".into(),
            })
    }

    fn error(message: impl Into<String>) -> CollaboratorError {
        CollaboratorError::Search {
            tool: Self::NAME.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl SearchTool for BraveSearch {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "General web search. Use for guidelines, news, consumer health pages and anything not strictly academic."
    }

    async fn run(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError> {
        let count = limit.clamp(1, COUNT_MAX).to_string();
        let res = self
            .client
            .get(brave_search_url())
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| Self::error(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Self::error(format!("Brave API error {}: {}", status, body)));
        }
        let parsed: BraveResponse = res.json().await.map_err(|e| Self::error(e.to_string()))?;
        Ok(parsed
            .web
            .unwrap_or_default()
            .results
            .into_iter()
            .take(limit)
            .map(SearchHit::from)
            .collect())
    }
}
