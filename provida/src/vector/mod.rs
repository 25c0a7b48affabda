//! Vector store collaborator: nearest-neighbor lookups for the duplicate gate
//! and evidence retrieval for planning.

mod embedder;
mod in_memory;
mod openai_embedder;

pub use embedder::{Embedder, HashEmbedder};
pub use in_memory::InMemoryVectorStore;
pub use openai_embedder::OpenAIEmbedder;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::CollaboratorError;

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub document_id: String,
    pub text: String,
    pub metadata: JsonValue,
    /// Cosine similarity in `[-1, 1]`; higher is closer.
    pub score: f32,
}

/// Text-in vector store. Embedding is the store's concern.
///
/// **Interaction**: `Arc<dyn VectorStore>` shared by `SemanticDuplicateGate`,
/// `KnowledgeIngestor` and the therapeutic planning node.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Closest stored document and its similarity; `None` when the store is empty.
    async fn nearest_neighbor(&self, text: &str) -> Result<Option<(String, f32)>, CollaboratorError>;

    /// Stores `text` with `metadata`; returns the new document id.
    async fn add(&self, text: &str, metadata: JsonValue) -> Result<String, CollaboratorError>;

    /// Up to `k` closest documents, best first.
    async fn search(&self, text: &str, k: usize) -> Result<Vec<VectorHit>, CollaboratorError>;

    async fn len(&self) -> Result<usize, CollaboratorError>;

    async fn is_empty(&self) -> Result<bool, CollaboratorError> {
        Ok(self.len().await? == 0)
    }
}
