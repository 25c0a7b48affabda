//! Search tools and the router that picks one per research question.

mod brave;
mod pubmed;
mod router;
mod static_search;

pub use brave::BraveSearch;
pub use pubmed::PubMedSearch;
pub use router::SearchRouter;
pub use static_search::StaticSearch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// One search result. Every field is optional; tools fill what they have.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub snippet: Option<String>,
}

impl SearchHit {
    /// Url, else title.
    pub fn source_identifier(&self) -> Option<&str> {
        non_blank(&self.url).or_else(|| non_blank(&self.title))
    }

    /// Content, else snippet.
    pub fn body(&self) -> Option<&str> {
        non_blank(&self.content).or_else(|| non_blank(&self.snippet))
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// External search tool.
///
/// **Interaction**: registered in `SearchRouter`; `name` and `description`
/// are shown to the gateway when it picks a tool.
#[async_trait]
pub trait SearchTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError>;
}
