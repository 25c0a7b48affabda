//! Canned search results for tests and offline runs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::search::{SearchHit, SearchTool};

/// Returns hits registered per exact query, else the fallback hits.
pub struct StaticSearch {
    name: String,
    description: String,
    by_query: HashMap<String, Vec<SearchHit>>,
    fallback: Vec<SearchHit>,
    fail_with: Option<String>,
}

impl StaticSearch {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            by_query: HashMap::new(),
            fallback: Vec::new(),
            fail_with: None,
        }
    }

    /// Hits for exactly `query` (builder).
    pub fn with_results(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.by_query.insert(query.into(), hits);
        self
    }

    /// Hits for any unregistered query (builder).
    pub fn with_fallback(mut self, hits: Vec<SearchHit>) -> Self {
        self.fallback = hits;
        self
    }

    /// Every call fails with a Search error (builder).
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }
}

#[async_trait]
impl SearchTool for StaticSearch {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError> {
        if let Some(message) = &self.fail_with {
            return Err(CollaboratorError::Search {
                tool: self.name.clone(),
                message: message.clone(),
            });
        }
        let hits = self.by_query.get(query).unwrap_or(&self.fallback);
        Ok(hits.iter().take(limit).cloned().collect())
    }
}
