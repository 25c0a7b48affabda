//! Seeding the knowledge base with known articles, without searching.
//!
//! Articles go through the research graph's own `analyze` and `update_kg`
//! nodes, so they are graded, gated and upserted exactly like search results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::decode::StructuredDecoder;
use crate::graph::{CompiledStateGraph, GraphDefinitionError, LoggingNodeMiddleware, StateGraph, END, START};
use crate::settings::WorkflowSettings;
use crate::workflows::{Collaborators, WorkflowError};

use super::nodes::{AnalyzeNode, ANALYZE, UPDATE_KG};
use super::state::{CollectedItem, ResearchState};
use super::update_kg_node;

/// Topic recorded for articles that do not name one.
pub const BOOTSTRAP_TOPIC: &str = "Initial bootstrapping";

const BOOTSTRAP_TOOL: &str = "bootstrap";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedArticle {
    /// Generated (`bootstrap-<uuid>`) when absent.
    pub source_identifier: Option<String>,
    pub content: String,
    pub research_topic: Option<String>,
}

impl SeedArticle {
    pub fn new(source_identifier: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_identifier: Some(source_identifier.into()),
            content: content.into(),
            research_topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.research_topic = Some(topic.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Articles graded successfully and handed to ingestion.
    pub processed: usize,
    /// Blank articles, skipped.
    pub skipped_empty: usize,
    /// Articles whose analysis failed; nothing was recorded for them.
    pub failed: usize,
}

/// `START → analyze → update_kg → END`, run once per research topic.
///
/// **Interaction**: shares the collaborators (and so the stores) of the
/// research workflow it seeds.
pub struct KnowledgeBootstrap {
    graph: CompiledStateGraph<ResearchState>,
}

impl KnowledgeBootstrap {
    pub fn new(collaborators: &Collaborators, settings: &WorkflowSettings) -> Result<Self, GraphDefinitionError> {
        let decoder = StructuredDecoder::new(collaborators.timed_llm(settings));
        let mut graph = StateGraph::<ResearchState>::new()
            .with_middleware(Arc::new(LoggingNodeMiddleware::<ResearchState>::default()));
        graph
            .add_node(
                ANALYZE,
                Arc::new(AnalyzeNode::new(decoder, settings.fan_out_concurrency)),
            )
            .add_node(UPDATE_KG, Arc::new(update_kg_node(collaborators, settings)))
            .add_edge(START, ANALYZE)
            .add_edge(ANALYZE, UPDATE_KG)
            .add_edge(UPDATE_KG, END);
        Ok(Self {
            graph: graph.compile()?,
        })
    }

    /// Grades and ingests `articles`, grouped by research topic in first-seen order.
    pub async fn run(&self, articles: Vec<SeedArticle>) -> Result<BootstrapReport, WorkflowError<ResearchState>> {
        let mut report = BootstrapReport::default();
        let mut groups: Vec<(String, Vec<CollectedItem>)> = Vec::new();
        for article in articles {
            let source_identifier = article
                .source_identifier
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("bootstrap-{}", uuid::Uuid::new_v4()));
            if article.content.trim().is_empty() {
                tracing::warn!(source = %source_identifier, "empty bootstrap article, skipping");
                report.skipped_empty += 1;
                continue;
            }
            let topic = article
                .research_topic
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| BOOTSTRAP_TOPIC.to_string());
            let item = CollectedItem {
                source_identifier,
                content: article.content,
                tool: BOOTSTRAP_TOOL.to_string(),
            };
            match groups.iter_mut().find(|(t, _)| *t == topic) {
                Some((_, items)) => items.push(item),
                None => groups.push((topic, vec![item])),
            }
        }

        for (topic, items) in groups {
            let mut state = ResearchState::new(topic.as_str(), 0);
            state.collected = items;
            let out = self.graph.invoke(state, None).await?;
            let failed = out.analyzed.iter().filter(|a| a.failed).count();
            report.failed += failed;
            report.processed += out.analyzed.len() - failed;
            tracing::info!(topic = %topic, articles = out.analyzed.len(), failed, "bootstrap topic done");
        }
        tracing::info!(?report, "knowledge bootstrap finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_db::InMemoryGraph;
    use crate::llm::MockLlm;
    use crate::vector::{HashEmbedder, InMemoryVectorStore, VectorStore};

    const GRADED: &str = r#"{"summary": "Leaks are early.", "evidence_level": "B", "justification": "RCT", "keywords": ["leak"]}"#;

    /// **Scenario**: Blank articles are skipped before any LLM call and nothing is stored.
    #[tokio::test]
    async fn blank_articles_cost_nothing() {
        let llm = Arc::new(MockLlm::with_content(GRADED));
        let vectors = Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::default())));
        let collaborators = Collaborators::new(llm.clone(), Arc::new(InMemoryGraph::new()), vectors.clone());
        let bootstrap = KnowledgeBootstrap::new(&collaborators, &WorkflowSettings::default()).unwrap();

        let report = bootstrap
            .run(vec![SeedArticle::new("a", "  "), SeedArticle::default()])
            .await
            .unwrap();
        assert_eq!(
            report,
            BootstrapReport {
                processed: 0,
                skipped_empty: 2,
                failed: 0
            }
        );
        assert_eq!(llm.call_count(), 0);
        assert!(vectors.is_empty().await.unwrap());
    }

    /// **Scenario**: One graph run per topic, in first-seen order.
    #[tokio::test]
    async fn articles_grouped_by_topic() {
        let llm = Arc::new(MockLlm::with_content(GRADED));
        let collaborators = Collaborators::new(
            llm.clone(),
            Arc::new(InMemoryGraph::new()),
            Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::default()))),
        );
        let bootstrap = KnowledgeBootstrap::new(&collaborators, &WorkflowSettings::default()).unwrap();

        let report = bootstrap
            .run(vec![
                SeedArticle::new("s1", "Sleeve gastrectomy leak rates.").with_topic("sleeve"),
                SeedArticle::new("b1", "Bypass and bile reflux."),
                SeedArticle::new("s2", "Sleeve gastrectomy reflux.").with_topic("sleeve"),
            ])
            .await
            .unwrap();
        assert_eq!(report.processed, 3);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains(BOOTSTRAP_TOPIC));
    }
}
