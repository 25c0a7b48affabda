//! Neo4j over its HTTP transactional endpoint (`/db/<database>/tx/commit`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::error::CollaboratorError;
use crate::graph_db::{GraphDatabase, Record, Statement};

#[derive(Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    data: Vec<RowData>,
}

#[derive(Deserialize)]
struct RowData {
    row: Vec<JsonValue>,
}

#[derive(Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

/// Graph database client speaking Cypher to Neo4j via reqwest.
///
/// **Interaction**: implements `GraphDatabase`; built from env by the caller
/// (`NEO4J_URL`, `NEO4J_USER`, `NEO4J_PASSWORD`, `NEO4J_DATABASE`).
pub struct Neo4jHttpGraph {
    client: reqwest::Client,
    base_url: String,
    database: String,
    user: String,
    password: String,
}

impl Neo4jHttpGraph {
    pub fn new(
        base_url: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Reads `NEO4J_URL` (default `http://localhost:7474`), `NEO4J_DATABASE`
    /// (default `neo4j`), `NEO4J_USER` (default `neo4j`) and `NEO4J_PASSWORD`.
    pub fn from_env() -> Result<Self, CollaboratorError> {
        let password = std::env::var("NEO4J_PASSWORD")
            .map_err(|_| CollaboratorError::GraphDb("NEO4J_PASSWORD is not set".into()))?;
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Ok(Self::new(
            var("NEO4J_URL", "http://localhost:7474"),
            var("NEO4J_DATABASE", "neo4j"),
            var("NEO4J_USER", "neo4j"),
            password,
        ))
    }

    fn commit_url(&self) -> String {
        format!("{}/db/{}/tx/commit", self.base_url, self.database)
    }
}

fn rows_to_records(result: StatementResult) -> Vec<Record> {
    result
        .data
        .into_iter()
        .map(|d| result.columns.iter().cloned().zip(d.row).collect())
        .collect()
}

#[async_trait]
impl GraphDatabase for Neo4jHttpGraph {
    async fn query(&self, statement: Statement) -> Result<Vec<Record>, CollaboratorError> {
        let body = json!({
            "statements": [{ "statement": statement.cypher, "parameters": statement.params }]
        });
        tracing::debug!(kind = ?statement.kind, url = %self.commit_url(), "neo4j query");

        let res = self
            .client
            .post(self.commit_url())
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::GraphDb(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let err_body = res.text().await.unwrap_or_default();
            return Err(CollaboratorError::GraphDb(format!(
                "Neo4j HTTP {}: {}",
                status, err_body
            )));
        }
        let out: CommitResponse = res
            .json()
            .await
            .map_err(|e| CollaboratorError::GraphDb(e.to_string()))?;
        if let Some(err) = out.errors.first() {
            return Err(CollaboratorError::GraphDb(format!("{}: {}", err.code, err.message)));
        }
        Ok(out.results.into_iter().flat_map(rows_to_records).collect())
    }
}
