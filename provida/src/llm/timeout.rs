//! Deadline wrapper for any `LlmClient`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{with_timeout, CollaboratorError};
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;

/// Fails a call with `CollaboratorError::Timeout` once `after` elapses.
pub struct TimeoutLlm {
    inner: Arc<dyn LlmClient>,
    after: Duration,
}

impl TimeoutLlm {
    pub fn new(inner: Arc<dyn LlmClient>, after: Duration) -> Self {
        Self { inner, after }
    }
}

#[async_trait]
impl LlmClient for TimeoutLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, CollaboratorError> {
        with_timeout("llm", self.after, self.inner.invoke(messages)).await
    }
}
