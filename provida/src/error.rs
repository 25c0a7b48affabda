//! Error types shared by nodes and collaborators.
//!
//! Graph wiring errors live in [`crate::graph::GraphDefinitionError`], run
//! failures in [`crate::graph::RunError`], decoding failures in
//! [`crate::decode::DecodeError`].

use std::time::Duration;

use thiserror::Error;

/// Network or service failure of an external collaborator.
///
/// Recoverable at node granularity: nodes log it and substitute an empty or
/// sentinel result. The engine never retries on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollaboratorError {
    #[error("llm: {0}")]
    Llm(String),
    #[error("vector store: {0}")]
    VectorStore(String),
    #[error("embedding: {0}")]
    Embedding(String),
    #[error("graph database: {0}")]
    GraphDb(String),
    #[error("search tool `{tool}`: {message}")]
    Search { tool: String, message: String },
    #[error("{service} timed out after {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },
}

impl CollaboratorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Error returned by a node; aborts the run it happens in.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Runs `fut` with a deadline; elapsing maps to [`CollaboratorError::Timeout`].
pub async fn with_timeout<T, F>(
    service: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, CollaboratorError>
where
    F: std::future::Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(service, after_ms = after.as_millis() as u64, "collaborator call timed out");
            Err(CollaboratorError::Timeout { service, after })
        }
    }
}
