//! In-memory vector store with cosine similarity. Not persistent.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;

use crate::error::CollaboratorError;
use crate::vector::{Embedder, VectorHit, VectorStore};

#[derive(Clone)]
struct VectorEntry {
    text: String,
    metadata: JsonValue,
    vector: Vec<f32>,
}

/// Vector store held in a `DashMap`, searched by brute-force cosine similarity.
///
/// **Interaction**: used as `Arc<dyn VectorStore>` in tests and offline runs.
pub struct InMemoryVectorStore {
    data: DashMap<String, VectorEntry>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            data: DashMap::new(),
            embedder,
        }
    }

    /// Returns 0.0 if either vector has zero magnitude.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        self.embedder
            .embed(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CollaboratorError::Embedding("no vector returned".into()))
    }

    /// Every entry scored against `query`, best first; ties broken by id.
    fn ranked(&self, query: &[f32]) -> Vec<VectorHit> {
        let mut hits: Vec<VectorHit> = self
            .data
            .iter()
            .map(|e| VectorHit {
                document_id: e.key().clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score: Self::cosine_similarity(query, &e.vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        hits
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn nearest_neighbor(
        &self,
        text: &str,
    ) -> Result<Option<(String, f32)>, CollaboratorError> {
        if self.data.is_empty() {
            return Ok(None);
        }
        let query = self.embed_one(text).await?;
        Ok(self
            .ranked(&query)
            .into_iter()
            .next()
            .map(|hit| (hit.document_id, hit.score)))
    }

    async fn add(&self, text: &str, metadata: JsonValue) -> Result<String, CollaboratorError> {
        let vector = self.embed_one(text).await?;
        let id = uuid::Uuid::new_v4().to_string();
        self.data.insert(
            id.clone(),
            VectorEntry {
                text: text.to_string(),
                metadata,
                vector,
            },
        );
        Ok(id)
    }

    async fn search(&self, text: &str, k: usize) -> Result<Vec<VectorHit>, CollaboratorError> {
        if self.data.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = self.embed_one(text).await?;
        let mut hits = self.ranked(&query);
        hits.truncate(k);
        Ok(hits)
    }

    async fn len(&self) -> Result<usize, CollaboratorError> {
        Ok(self.data.len())
    }
}
