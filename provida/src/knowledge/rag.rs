//! Question answering over the ingested chunks: retrieve the closest chunks
//! from the vector store, then have the LLM answer from them alone.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CollaboratorError;
use crate::llm::LlmClient;
use crate::vector::{VectorHit, VectorStore};

/// Answer given when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str =
    "No relevant information was found in the knowledge base to answer this question.";

const UNKNOWN_SOURCE: &str = "unknown source";
const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub summary: String,
    /// Distinct `source_identifier`s of the retrieved chunks, sorted.
    pub sources: Vec<String>,
    /// False when nothing was retrieved and `summary` is [`NO_CONTEXT_ANSWER`].
    pub grounded: bool,
}

fn source_of(hit: &VectorHit) -> &str {
    hit.metadata
        .get("source_identifier")
        .and_then(|v| v.as_str())
        .unwrap_or(UNKNOWN_SOURCE)
}

/// Renders retrieved chunks as one context block, each chunk under its source.
pub fn context_block(hits: &[VectorHit]) -> String {
    hits.iter()
        .map(|h| format!("Source: {}\n\nContent: {}", source_of(h), h.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Retrieval-augmented query over what `KnowledgeIngestor` stored.
///
/// **Interaction**: reads the same `Arc<dyn VectorStore>` the research
/// workflow ingests into; one LLM call per grounded answer, none otherwise.
#[derive(Clone)]
pub struct RagQuery {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl RagQuery {
    pub fn new(store: Arc<dyn VectorStore>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            store,
            llm,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// The closest chunks for `query`, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<VectorHit>, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        Ok(self.store.search(query, self.top_k).await?)
    }

    /// Answers `query` from the retrieved chunks.
    pub async fn answer(&self, query: &str) -> Result<RagAnswer, RagError> {
        let hits = self.retrieve(query).await?;
        if hits.is_empty() {
            tracing::info!(query, "no chunks retrieved");
            return Ok(RagAnswer {
                summary: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                grounded: false,
            });
        }
        let sources: BTreeSet<String> = hits.iter().map(|h| source_of(h).to_string()).collect();
        let prompt = format!(
            "Answer the question concisely and directly, using only the document excerpts below.\n\
             Question: {}\n\nDocuments:\n{}\n\nAnswer:",
            query.trim(),
            context_block(&hits)
        );
        let summary = self.llm.generate(&prompt).await?;
        tracing::debug!(query, chunks = hits.len(), sources = sources.len(), "rag answer");
        Ok(RagAnswer {
            summary: summary.trim().to_string(),
            sources: sources.into_iter().collect(),
            grounded: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::vector::{HashEmbedder, InMemoryVectorStore};

    fn store() -> Arc<InMemoryVectorStore> {
        Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::default())))
    }

    /// **Scenario**: An empty store yields the fixed refusal without calling the LLM.
    #[tokio::test]
    async fn empty_store_refuses_without_llm() {
        let llm = Arc::new(MockLlm::with_content("should not be used"));
        let rag = RagQuery::new(store(), llm.clone());
        let answer = rag.answer("Is metformin safe after bariatric surgery?").await.unwrap();
        assert!(!answer.grounded);
        assert_eq!(answer.summary, NO_CONTEXT_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    /// **Scenario**: A blank query is rejected before any lookup.
    #[tokio::test]
    async fn blank_query_is_rejected() {
        let rag = RagQuery::new(store(), Arc::new(MockLlm::with_content("x")));
        assert!(matches!(rag.answer("   ").await, Err(RagError::EmptyQuery)));
    }

    /// **Scenario**: Retrieved chunks reach the prompt and their sources are reported once each.
    #[tokio::test]
    async fn answer_cites_retrieved_sources() {
        let vectors = store();
        vectors
            .add("Sleeve gastrectomy leaks occur early.", serde_json::json!({"source_identifier": "pmid:1"}))
            .await
            .unwrap();
        vectors
            .add("Leaks after sleeve gastrectomy need drainage.", serde_json::json!({"source_identifier": "pmid:1"}))
            .await
            .unwrap();
        vectors
            .add("Gastric bypass alters bile flow.", serde_json::json!({}))
            .await
            .unwrap();
        let llm = Arc::new(MockLlm::with_content("  Leaks are early complications.  "));
        let rag = RagQuery::new(vectors, llm.clone()).with_top_k(3);

        let answer = rag.answer("sleeve gastrectomy leaks").await.unwrap();
        assert!(answer.grounded);
        assert_eq!(answer.summary, "Leaks are early complications.");
        assert_eq!(answer.sources, vec!["pmid:1".to_string(), UNKNOWN_SOURCE.to_string()]);
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Source: pmid:1"));
        assert!(prompt.contains("Leaks after sleeve gastrectomy need drainage."));
    }

    /// **Scenario**: An LLM failure is reported, not turned into an answer.
    #[tokio::test]
    async fn llm_failure_propagates() {
        let vectors = store();
        vectors
            .add("Orlistat reduces fat absorption.", serde_json::json!({"source_identifier": "s"}))
            .await
            .unwrap();
        let rag = RagQuery::new(vectors, Arc::new(MockLlm::failing("down")));
        let err = rag.answer("orlistat").await.unwrap_err();
        assert!(matches!(err, RagError::Collaborator(CollaboratorError::Llm(_))), "{:?}", err);
    }
}
