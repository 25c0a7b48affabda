//! Picks a search tool per query by asking the gateway, with a default fallback.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{with_timeout, CollaboratorError};
use crate::llm::LlmClient;
use crate::search::{SearchHit, SearchTool};

const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes queries to registered tools.
///
/// With a gateway and more than one tool, the gateway is shown every tool's
/// name and description and answers with a tool name. An unknown answer or a
/// gateway failure falls back to the default tool. Every tool call runs under
/// the router's timeout.
///
/// **Interaction**: used by the deep-research `collect` node.
pub struct SearchRouter {
    default_tool: Arc<dyn SearchTool>,
    others: Vec<Arc<dyn SearchTool>>,
    llm: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl SearchRouter {
    /// `default_tool` is used whenever no better choice is made.
    pub fn new(default_tool: Arc<dyn SearchTool>) -> Self {
        Self {
            default_tool,
            others: Vec::new(),
            llm: None,
            timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn SearchTool>) -> Self {
        self.others.push(tool);
        self
    }

    /// Gateway consulted to choose a tool.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn tools(&self) -> impl Iterator<Item = &Arc<dyn SearchTool>> {
        std::iter::once(&self.default_tool).chain(self.others.iter())
    }

    fn routing_prompt(&self, query: &str) -> String {
        let tools: String = self
            .tools()
            .map(|t| format!("- `{}`: {}\n", t.name(), t.description()))
            .collect();
        format!(
            "Choose the best search tool for the query below.\n\
             Available tools:\n{tools}\n\
             Query: {query}\n\n\
             Answer with the tool name only."
        )
    }

    /// Tool for `query`; never fails.
    pub async fn choose_tool(&self, query: &str) -> Arc<dyn SearchTool> {
        let Some(llm) = self.llm.as_ref().filter(|_| !self.others.is_empty()) else {
            return self.default_tool.clone();
        };
        let answer = match llm.generate(&self.routing_prompt(query)).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "tool routing failed, using default tool");
                return self.default_tool.clone();
            }
        };
        let name = answer.trim().trim_matches(|c: char| c == '`' || c == '"' || c == '\'');
        match self.tools().find(|t| t.name().eq_ignore_ascii_case(name)) {
            Some(tool) => {
                tracing::debug!(query = %query, tool = tool.name(), "tool chosen");
                tool.clone()
            }
            None => {
                tracing::warn!(answer = %name, "gateway named an unknown tool, using default tool");
                self.default_tool.clone()
            }
        }
    }

    /// Routes and runs `query`; returns the tool's name with its hits.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<(String, Vec<SearchHit>), CollaboratorError> {
        let tool = self.choose_tool(query).await;
        let hits = with_timeout("search", self.timeout, tool.run(query, limit)).await?;
        Ok((tool.name().to_string(), hits))
    }
}
