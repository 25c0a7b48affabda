//! Idempotent knowledge-graph writes for analyses and patients.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::CollaboratorError;
use crate::graph_db::{GraphDatabase, Statement};

/// MERGE-style upserts; replaying any call leaves the graph unchanged.
///
/// **Interaction**: used by the therapeutic `anamnesis`/`diagnosis` nodes and
/// the deep-research `update_kg` node.
#[derive(Clone)]
pub struct KnowledgeGraphWriter {
    graph: Arc<dyn GraphDatabase>,
}

impl KnowledgeGraphWriter {
    pub fn new(graph: Arc<dyn GraphDatabase>) -> Self {
        Self { graph }
    }

    /// Topic, Source, Summary, EvidenceLevel and Keyword nodes for one analysis,
    /// with RELATED_TO, CONTAINS, HAS_SUMMARY, HAS_EVIDENCE and MENTIONS edges.
    pub async fn upsert_analysis(
        &self,
        research_topic: &str,
        source_identifier: &str,
        summary: &str,
        evidence_level: &str,
        keywords: &[String],
    ) -> Result<(), CollaboratorError> {
        self.graph
            .query(Statement::upsert_analysis(
                research_topic,
                source_identifier,
                summary,
                evidence_level,
                keywords,
            ))
            .await?;
        tracing::debug!(source_identifier, research_topic, "analysis written to graph");
        Ok(())
    }

    /// Merges `data`'s fields (null fields skipped) into `(:Patient {id})`.
    pub async fn upsert_patient<T: Serialize>(&self, id: &str, data: &T) -> Result<(), CollaboratorError> {
        let mut properties = serde_json::to_value(data)
            .map_err(|e| CollaboratorError::GraphDb(format!("patient serialization: {}", e)))?;
        if let JsonValue::Object(map) = &mut properties {
            map.retain(|_, v| !v.is_null());
        }
        self.graph
            .query(Statement::upsert_patient(id, properties))
            .await?;
        Ok(())
    }

    /// Patient properties, or `None` when the patient is unknown.
    pub async fn patient_context(&self, id: &str) -> Result<Option<JsonValue>, CollaboratorError> {
        let rows = self.graph.query(Statement::patient_context(id)).await?;
        Ok(rows.into_iter().next().and_then(|mut row| row.remove("patient")))
    }
}
