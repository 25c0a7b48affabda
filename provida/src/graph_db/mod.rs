//! Graph database collaborator.
//!
//! Callers build a [`Statement`] through its typed constructors (see
//! `statements.rs`), which carry both the Cypher text and a [`StatementKind`]
//! tag. [`Neo4jHttpGraph`] sends the Cypher; [`InMemoryGraph`] executes the
//! kind directly, which is what makes it usable offline and in tests.

mod in_memory;
mod neo4j;
mod statements;

pub use in_memory::InMemoryGraph;
pub use neo4j::Neo4jHttpGraph;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::error::CollaboratorError;

/// One result row: column name -> value.
pub type Record = Map<String, JsonValue>;

/// What a statement does, independent of its Cypher text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Any relationship from `subject` to `object` whose type contains `predicate`.
    /// Returns one row `{verified: bool}`.
    VerifyClaim,
    /// Topic / Source / Summary / EvidenceLevel / Keyword upsert for one analysis.
    UpsertAnalysis,
    /// Source node keyed by identifier, with content hash and ingestion status.
    UpsertSource,
    /// Sources carrying a content hash. Rows `{identifier, status}`.
    FindSourceByHash,
    /// Patient node keyed by id.
    UpsertPatient,
    /// Patient properties by id. One row `{patient: {...}}` or none.
    PatientContext,
    /// Relationship between two named nodes, created if absent.
    Relate,
    /// Caller-written Cypher; only backends that speak Cypher accept it.
    Raw,
}

/// Cypher text plus parameters, tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub cypher: String,
    pub params: JsonValue,
}

impl Statement {
    /// Caller-written Cypher.
    pub fn raw(cypher: impl Into<String>, params: JsonValue) -> Self {
        Self {
            kind: StatementKind::Raw,
            cypher: cypher.into(),
            params,
        }
    }

    /// String parameter `key`, empty when absent.
    pub fn param_str(&self, key: &str) -> &str {
        self.params.get(key).and_then(JsonValue::as_str).unwrap_or("")
    }
}

/// Graph database handle.
///
/// **Interaction**: `Arc<dyn GraphDatabase>` shared by `KnowledgeVerifier`,
/// `KnowledgeGraphWriter` and `KnowledgeIngestor`.
#[async_trait]
pub trait GraphDatabase: Send + Sync {
    async fn query(&self, statement: Statement) -> Result<Vec<Record>, CollaboratorError>;
}
