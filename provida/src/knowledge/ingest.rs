//! Gated ingestion of source text into the vector store and the graph.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CollaboratorError;
use crate::graph_db::{GraphDatabase, Statement};
use crate::knowledge::SemanticDuplicateGate;
use crate::vector::VectorStore;

const STATUS_INGESTED: &str = "ingested";
const STATUS_SKIPPED_SEMANTIC: &str = "skipped_semantic_duplicate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateReason {
    /// A Source node already carries this content hash.
    SameContent,
    /// The nearest stored neighbor is above the similarity threshold.
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    Ingested { chunks: usize },
    Duplicate { reason: DuplicateReason },
    /// Blank text; nothing recorded.
    Empty,
}

/// SHA-256 of `text`, lowercase hex.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Splits `text` into windows of `size` characters, each starting
/// `size - overlap` characters after the previous one. The last window may be
/// shorter. `overlap` is clamped below `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    let step = size - overlap.min(size - 1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            return chunks;
        }
        start += step;
    }
}

/// Ingests source text at most once.
///
/// 1. blank text: `Empty`;
/// 2. content hash already on a Source node: `Duplicate(SameContent)`;
/// 3. semantic duplicate: Source recorded as skipped, nothing embedded;
/// 4. otherwise chunks go to the vector store and the Source is recorded as ingested.
///
/// **Interaction**: called by the deep-research `update_kg` node.
#[derive(Clone)]
pub struct KnowledgeIngestor {
    store: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphDatabase>,
    gate: SemanticDuplicateGate,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl KnowledgeIngestor {
    pub fn new(store: Arc<dyn VectorStore>, graph: Arc<dyn GraphDatabase>) -> Self {
        Self {
            gate: SemanticDuplicateGate::new(store.clone()),
            store,
            graph,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }

    /// Replaces the default gate (e.g. to change its threshold).
    pub fn with_gate(mut self, gate: SemanticDuplicateGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_chunking(mut self, size: usize, overlap: usize) -> Self {
        self.chunk_size = size;
        self.chunk_overlap = overlap;
        self
    }

    async fn hash_known(&self, hash: &str) -> Result<bool, CollaboratorError> {
        let rows = self.graph.query(Statement::find_source_by_hash(hash)).await?;
        Ok(!rows.is_empty())
    }

    pub async fn ingest(&self, source_id: &str, text: &str) -> Result<IngestOutcome, CollaboratorError> {
        if text.trim().is_empty() {
            return Ok(IngestOutcome::Empty);
        }
        let hash = content_hash(text);
        if self.hash_known(&hash).await? {
            tracing::info!(source_id, hash = &hash[..8], "content already ingested, skipping");
            return Ok(IngestOutcome::Duplicate {
                reason: DuplicateReason::SameContent,
            });
        }
        if self.gate.is_duplicate(text).await {
            tracing::info!(source_id, "semantic duplicate, skipping");
            self.graph
                .query(Statement::upsert_source(source_id, &hash, STATUS_SKIPPED_SEMANTIC))
                .await?;
            return Ok(IngestOutcome::Duplicate {
                reason: DuplicateReason::Semantic,
            });
        }

        let chunks = chunk_text(text, self.chunk_size, self.chunk_overlap);
        for chunk in &chunks {
            self.store
                .add(
                    chunk,
                    serde_json::json!({ "source_identifier": source_id, "content_hash": hash }),
                )
                .await?;
        }
        self.graph
            .query(Statement::upsert_source(source_id, &hash, STATUS_INGESTED))
            .await?;
        tracing::info!(source_id, chunks = chunks.len(), "source ingested");
        Ok(IngestOutcome::Ingested {
            chunks: chunks.len(),
        })
    }
}
