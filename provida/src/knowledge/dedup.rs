//! Semantic duplicate gate in front of ingestion.

use std::sync::Arc;

use crate::vector::VectorStore;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.95;

/// Rejects text whose nearest stored neighbor is at least `threshold` similar.
///
/// **Interaction**: consulted by `KnowledgeIngestor` before anything is added
/// to the vector store.
#[derive(Clone)]
pub struct SemanticDuplicateGate {
    store: Arc<dyn VectorStore>,
    threshold: f32,
}

impl SemanticDuplicateGate {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Duplicate check with the gate's own threshold.
    pub async fn is_duplicate(&self, text: &str) -> bool {
        self.is_duplicate_with(text, self.threshold).await
    }

    /// `score >= threshold` for the single nearest neighbor. An empty or
    /// unavailable store is never a duplicate.
    pub async fn is_duplicate_with(&self, text: &str, threshold: f32) -> bool {
        match self.store.nearest_neighbor(text).await {
            Ok(Some((document_id, score))) => {
                let duplicate = score >= threshold;
                tracing::debug!(%document_id, score, threshold, duplicate, "nearest neighbor");
                duplicate
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "vector store unavailable, treating text as new");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{HashEmbedder, InMemoryVectorStore};

    /// **Scenario**: Empty store never flags; identical text flags; lowering threshold widens the gate.
    #[tokio::test]
    async fn threshold_semantics() {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::new(256))));
        let gate = SemanticDuplicateGate::new(store.clone());
        assert!(!gate.is_duplicate("vitamin D dosage for adults").await);

        store
            .add("vitamin D dosage for adults", serde_json::json!({}))
            .await
            .unwrap();
        assert!(gate.is_duplicate("Vitamin D dosage for adults").await);
        assert!(!gate.is_duplicate("vitamin D dosage for older adults in winter").await);
        assert!(
            gate.is_duplicate_with("vitamin D dosage for older adults in winter", 0.5)
                .await
        );
    }
}
