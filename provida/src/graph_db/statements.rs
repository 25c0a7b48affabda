//! Typed constructors for every statement the crate issues.
//!
//! All writes are MERGE upserts keyed by a stable property, so replaying them
//! (or running them concurrently) leaves the graph unchanged.

use serde_json::{json, Value as JsonValue};

use super::{Statement, StatementKind};

const VERIFY_CLAIM: &str = r#"
MATCH (s)-[r]->(o)
WHERE (toLower(s.name) = toLower($subject) OR toLower(s.identifier) = toLower($subject) OR toLower(s.text) = toLower($subject))
  AND (toLower(o.name) = toLower($object) OR toLower(o.identifier) = toLower($object) OR toLower(o.text) = toLower($object))
  AND toLower(type(r)) CONTAINS toLower($predicate)
RETURN count(r) > 0 AS verified
"#;

const UPSERT_ANALYSIS: &str = r#"
MERGE (topic:Topic {name: $research_topic})
MERGE (source:Source {identifier: $source_identifier})
MERGE (evidence:EvidenceLevel {level: $evidence_level})
MERGE (source)-[:RELATED_TO]->(topic)
MERGE (summary:Summary {text: $summary, source_identifier: $source_identifier})
MERGE (source)-[:CONTAINS]->(summary)
MERGE (topic)-[:HAS_SUMMARY]->(summary)
MERGE (summary)-[:HAS_EVIDENCE]->(evidence)
WITH summary
UNWIND $keywords AS keyword_name
MERGE (kw:Keyword {name: keyword_name})
MERGE (summary)-[:MENTIONS]->(kw)
"#;

const UPSERT_SOURCE: &str = r#"
MERGE (s:Source {identifier: $identifier})
ON CREATE SET s.content_hash = $content_hash, s.status = $status, s.created_at = timestamp()
ON MATCH SET s.content_hash = $content_hash, s.status = $status, s.updated_at = timestamp()
"#;

const FIND_SOURCE_BY_HASH: &str = r#"
MATCH (s:Source {content_hash: $content_hash})
RETURN s.identifier AS identifier, s.status AS status
"#;

const UPSERT_PATIENT: &str = r#"
MERGE (p:Patient {id: $id})
SET p += $properties
"#;

const PATIENT_CONTEXT: &str = r#"
MATCH (p:Patient {id: $id})
RETURN properties(p) AS patient
"#;

/// Relationship types cannot be parameters in Cypher; `$rel_type` is spliced
/// in by `Statement::relate` after sanitizing.
const RELATE: &str = r#"
MERGE (a {name: $subject})
MERGE (b {name: $object})
MERGE (a)-[:REL_TYPE]->(b)
"#;

/// Uppercase identifier made of `[A-Z0-9_]`, usable as a relationship type.
fn sanitize_rel_type(rel_type: &str) -> String {
    let cleaned: String = rel_type
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "RELATED_TO".to_string()
    } else {
        cleaned
    }
}

impl Statement {
    fn typed(kind: StatementKind, cypher: &str, params: JsonValue) -> Self {
        Self {
            kind,
            cypher: cypher.trim().to_string(),
            params,
        }
    }

    /// `predicate` should already be normalized to its significant token.
    pub fn verify_claim(subject: &str, predicate: &str, object: &str) -> Self {
        Self::typed(
            StatementKind::VerifyClaim,
            VERIFY_CLAIM,
            json!({ "subject": subject, "predicate": predicate, "object": object }),
        )
    }

    pub fn upsert_analysis(
        research_topic: &str,
        source_identifier: &str,
        summary: &str,
        evidence_level: &str,
        keywords: &[String],
    ) -> Self {
        Self::typed(
            StatementKind::UpsertAnalysis,
            UPSERT_ANALYSIS,
            json!({
                "research_topic": research_topic,
                "source_identifier": source_identifier,
                "summary": summary,
                "evidence_level": evidence_level,
                "keywords": keywords,
            }),
        )
    }

    pub fn upsert_source(identifier: &str, content_hash: &str, status: &str) -> Self {
        Self::typed(
            StatementKind::UpsertSource,
            UPSERT_SOURCE,
            json!({ "identifier": identifier, "content_hash": content_hash, "status": status }),
        )
    }

    pub fn find_source_by_hash(content_hash: &str) -> Self {
        Self::typed(
            StatementKind::FindSourceByHash,
            FIND_SOURCE_BY_HASH,
            json!({ "content_hash": content_hash }),
        )
    }

    /// `properties` must be a JSON object; it is merged into the node.
    pub fn upsert_patient(id: &str, properties: JsonValue) -> Self {
        Self::typed(
            StatementKind::UpsertPatient,
            UPSERT_PATIENT,
            json!({ "id": id, "properties": properties }),
        )
    }

    pub fn patient_context(id: &str) -> Self {
        Self::typed(StatementKind::PatientContext, PATIENT_CONTEXT, json!({ "id": id }))
    }

    /// `(subject)-[:REL_TYPE]->(object)` between nodes matched by `name`.
    pub fn relate(subject: &str, rel_type: &str, object: &str) -> Self {
        let rel_type = sanitize_rel_type(rel_type);
        Self {
            kind: StatementKind::Relate,
            cypher: RELATE.trim().replace("REL_TYPE", &rel_type),
            params: json!({ "subject": subject, "rel_type": rel_type, "object": object }),
        }
    }
}
