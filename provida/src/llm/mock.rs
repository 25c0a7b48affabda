//! Mock LLM for tests and offline runs.
//!
//! Fan-out nodes call the gateway concurrently, so call order is not stable.
//! Prefer [`MockLlm::from_fn`], which answers by prompt content, whenever more
//! than one call can be in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;

type Responder = Box<dyn Fn(&str) -> Result<String, CollaboratorError> + Send + Sync>;

/// Mock gateway: fixed, scripted or prompt-driven responses.
///
/// The prompt handed to responders is every message's content joined by a
/// blank line.
///
/// **Interaction**: implements `LlmClient`; used in unit and integration tests.
pub struct MockLlm {
    responder: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    fn with_responder(responder: Responder) -> Self {
        Self {
            responder,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::with_responder(Box::new(move |_| Ok(content.clone())))
    }

    /// Answers `responses` in call order; the last one repeats once exhausted.
    pub fn scripted<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let responses: Vec<String> = responses.into_iter().map(Into::into).collect();
        let next = AtomicUsize::new(0);
        Self::with_responder(Box::new(move |_| {
            let i = next.fetch_add(1, Ordering::SeqCst);
            responses
                .get(i)
                .or_else(|| responses.last())
                .cloned()
                .ok_or_else(|| CollaboratorError::Llm("mock has no scripted responses".into()))
        }))
    }

    /// Answers `f(prompt)`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::with_responder(Box::new(move |prompt| Ok(f(prompt))))
    }

    /// Fails every call with `CollaboratorError::Llm(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_responder(Box::new(move |_| Err(CollaboratorError::Llm(message.clone()))))
    }

    /// Sleeps before answering (builder); used to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .iter()
            .map(Message::content)
            .collect::<Vec<_>>()
            .join("\n\n");
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let content = (self.responder)(&prompt)?;
        Ok(LlmResponse {
            content,
            usage: None,
        })
    }
}
