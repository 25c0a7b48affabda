//! Claim verification against the knowledge graph.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::graph::fan_out;
use crate::graph_db::{GraphDatabase, Statement};
use crate::knowledge::Claim;

/// Outcome of verifying a batch of claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub hallucination_detected: bool,
    pub verified_count: usize,
    pub unverified_count: usize,
    pub verified_claims: Vec<Claim>,
    pub unverified_claims: Vec<Claim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationReport {
    /// Zero-count report carrying only a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    fn from_partition(verified: Vec<Claim>, unverified: Vec<Claim>) -> Self {
        Self {
            hallucination_detected: !unverified.is_empty(),
            verified_count: verified.len(),
            unverified_count: unverified.len(),
            verified_claims: verified,
            unverified_claims: unverified,
            message: None,
        }
    }
}

/// Final significant token of a predicate, lowercased:
/// `HAS_COMPLICATION` -> `complication`, `can cause` -> `cause`.
pub fn normalize_predicate(predicate: &str) -> String {
    predicate
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .last()
        .unwrap_or("")
        .to_lowercase()
}

/// Checks claims for a supporting relationship in the graph.
///
/// **Interaction**: used by the deep-research `fact_check` node.
#[derive(Clone)]
pub struct KnowledgeVerifier {
    graph: Arc<dyn GraphDatabase>,
    concurrency: usize,
}

impl KnowledgeVerifier {
    pub fn new(graph: Arc<dyn GraphDatabase>) -> Self {
        Self {
            graph,
            concurrency: 4,
        }
    }

    /// Concurrent verifications in `bulk_verify` (builder).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// True iff a relationship from `subject` to `object` has a type containing
    /// the normalized predicate. A predicate that normalizes to nothing, and
    /// query errors, count as unverified.
    pub async fn verify_claim(&self, claim: &Claim) -> bool {
        let predicate = normalize_predicate(&claim.predicate);
        if predicate.is_empty() {
            tracing::debug!(predicate = %claim.predicate, subject = %claim.subject, "predicate has no tokens");
            return false;
        }
        let statement = Statement::verify_claim(&claim.subject, &predicate, &claim.object);
        match self.graph.query(statement).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("verified"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, subject = %claim.subject, "claim verification query failed");
                false
            }
        }
    }

    /// Verifies every claim independently and partitions them, keeping input order.
    pub async fn bulk_verify(&self, claims: &[Claim]) -> VerificationReport {
        let outcomes = fan_out(claims.iter().cloned(), self.concurrency, |claim| async move {
            let ok = self.verify_claim(&claim).await;
            (claim, ok)
        })
        .await;
        let (verified, unverified): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(|(_, ok)| *ok);
        let report = VerificationReport::from_partition(
            verified.into_iter().map(|(c, _)| c).collect(),
            unverified.into_iter().map(|(c, _)| c).collect(),
        );
        tracing::info!(
            verified = report.verified_count,
            unverified = report.unverified_count,
            "claims verified"
        );
        report
    }
}
