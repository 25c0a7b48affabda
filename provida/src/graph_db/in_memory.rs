//! In-process property graph that executes the crate's statement kinds.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};

use crate::error::CollaboratorError;
use crate::graph_db::{GraphDatabase, Record, Statement, StatementKind};

/// `(label, key value)`; the key property depends on the label.
type NodeKey = (String, String);

#[derive(Default)]
struct GraphData {
    nodes: BTreeMap<NodeKey, Map<String, JsonValue>>,
    relationships: BTreeSet<(NodeKey, String, NodeKey)>,
}

impl GraphData {
    fn merge_node(&mut self, label: &str, key: &str, props: &[(&str, JsonValue)]) -> NodeKey {
        let node_key = (label.to_string(), key.to_string());
        let node = self.nodes.entry(node_key.clone()).or_default();
        for (name, value) in props {
            node.insert((*name).to_string(), value.clone());
        }
        node_key
    }

    fn merge_rel(&mut self, from: &NodeKey, rel_type: &str, to: &NodeKey) {
        self.relationships
            .insert((from.clone(), rel_type.to_string(), to.clone()));
    }

    fn matches(&self, key: &NodeKey, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.nodes.get(key).is_some_and(|props| {
            ["name", "identifier", "text"].iter().any(|p| {
                props
                    .get(*p)
                    .and_then(JsonValue::as_str)
                    .is_some_and(|v| v.to_lowercase() == needle)
            })
        })
    }
}

/// Property graph held in memory. MERGE semantics: writing the same statement
/// twice leaves one node per key and one relationship per triple.
///
/// Rejects `StatementKind::Raw`.
///
/// **Interaction**: used as `Arc<dyn GraphDatabase>` in tests and offline runs.
#[derive(Default)]
pub struct InMemoryGraph {
    data: RwLock<GraphData>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GraphData> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GraphData> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of nodes with `label`.
    pub fn node_count(&self, label: &str) -> usize {
        self.read().nodes.keys().filter(|(l, _)| l == label).count()
    }

    pub fn relationship_count(&self) -> usize {
        self.read().relationships.len()
    }

    /// Properties of the node with `label` and key value `key`.
    pub fn node(&self, label: &str, key: &str) -> Option<Map<String, JsonValue>> {
        self.read()
            .nodes
            .get(&(label.to_string(), key.to_string()))
            .cloned()
    }

    fn execute(&self, st: &Statement) -> Result<Vec<Record>, CollaboratorError> {
        match st.kind {
            StatementKind::VerifyClaim => {
                let data = self.read();
                let predicate = st.param_str("predicate").to_lowercase();
                let verified = data.relationships.iter().any(|(from, rel, to)| {
                    rel.to_lowercase().contains(&predicate)
                        && data.matches(from, st.param_str("subject"))
                        && data.matches(to, st.param_str("object"))
                });
                Ok(vec![record(json!({ "verified": verified }))])
            }
            StatementKind::UpsertAnalysis => {
                let source_id = st.param_str("source_identifier");
                let summary_text = st.param_str("summary");
                let mut data = self.write();
                let topic = data.merge_node(
                    "Topic",
                    st.param_str("research_topic"),
                    &[("name", json!(st.param_str("research_topic")))],
                );
                let source = data.merge_node("Source", source_id, &[("identifier", json!(source_id))]);
                let evidence = data.merge_node(
                    "EvidenceLevel",
                    st.param_str("evidence_level"),
                    &[("level", json!(st.param_str("evidence_level")))],
                );
                data.merge_rel(&source, "RELATED_TO", &topic);
                let summary = data.merge_node(
                    "Summary",
                    &format!("{}\u{1f}{}", source_id, summary_text),
                    &[
                        ("text", json!(summary_text)),
                        ("source_identifier", json!(source_id)),
                    ],
                );
                data.merge_rel(&source, "CONTAINS", &summary);
                data.merge_rel(&topic, "HAS_SUMMARY", &summary);
                data.merge_rel(&summary, "HAS_EVIDENCE", &evidence);
                let keywords = st
                    .params
                    .get("keywords")
                    .and_then(JsonValue::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(JsonValue::as_str);
                for kw in keywords {
                    let keyword = data.merge_node("Keyword", kw, &[("name", json!(kw))]);
                    data.merge_rel(&summary, "MENTIONS", &keyword);
                }
                Ok(Vec::new())
            }
            StatementKind::UpsertSource => {
                let id = st.param_str("identifier");
                self.write().merge_node(
                    "Source",
                    id,
                    &[
                        ("identifier", json!(id)),
                        ("content_hash", json!(st.param_str("content_hash"))),
                        ("status", json!(st.param_str("status"))),
                    ],
                );
                Ok(Vec::new())
            }
            StatementKind::FindSourceByHash => {
                let hash = st.param_str("content_hash");
                Ok(self
                    .read()
                    .nodes
                    .iter()
                    .filter(|((label, _), props)| {
                        label == "Source"
                            && props.get("content_hash").and_then(JsonValue::as_str) == Some(hash)
                    })
                    .map(|((_, id), props)| {
                        record(json!({
                            "identifier": id,
                            "status": props.get("status").cloned().unwrap_or(JsonValue::Null),
                        }))
                    })
                    .collect())
            }
            StatementKind::UpsertPatient => {
                let id = st.param_str("id");
                let mut props: Vec<(&str, JsonValue)> = vec![("id", json!(id))];
                if let Some(obj) = st.params.get("properties").and_then(JsonValue::as_object) {
                    props.extend(obj.iter().map(|(k, v)| (k.as_str(), v.clone())));
                }
                self.write().merge_node("Patient", id, &props);
                Ok(Vec::new())
            }
            StatementKind::PatientContext => Ok(self
                .node("Patient", st.param_str("id"))
                .map(|p| record(json!({ "patient": p })))
                .into_iter()
                .collect()),
            StatementKind::Relate => {
                let subject = st.param_str("subject");
                let object = st.param_str("object");
                let mut data = self.write();
                let a = data.merge_node("Entity", subject, &[("name", json!(subject))]);
                let b = data.merge_node("Entity", object, &[("name", json!(object))]);
                data.merge_rel(&a, st.param_str("rel_type"), &b);
                Ok(Vec::new())
            }
            StatementKind::Raw => Err(CollaboratorError::GraphDb(
                "in-memory graph does not execute raw Cypher".into(),
            )),
        }
    }
}

fn record(value: JsonValue) -> Record {
    match value {
        JsonValue::Object(map) => map,
        _ => Record::new(),
    }
}

#[async_trait]
impl GraphDatabase for InMemoryGraph {
    async fn query(&self, statement: Statement) -> Result<Vec<Record>, CollaboratorError> {
        tracing::trace!(kind = ?statement.kind, "in-memory graph query");
        self.execute(&statement)
    }
}
