//! LLM gateway abstraction.
//!
//! Every model call in the workflows goes through [`LlmClient`]. Implementations:
//! [`ChatOpenAI`] (OpenAI-compatible Chat Completions), [`MockLlm`] (tests and
//! offline runs) and [`TimeoutLlm`], which puts a deadline on any other client.

mod mock;
mod openai;
mod timeout;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;
pub use timeout::TimeoutLlm;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::message::Message;

/// Token usage for one LLM call.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Raw assistant text from one completion.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    pub content: String,
    /// Present when the provider reports it.
    pub usage: Option<LlmUsage>,
}

/// LLM gateway: given messages, returns the assistant's raw text.
///
/// The text may be anything, including malformed JSON; structured callers go
/// through [`crate::decode::StructuredDecoder`].
///
/// **Interaction**: shared as `Arc<dyn LlmClient>` by the claim extractor, the
/// search router, the decoder's repair step and the workflow nodes.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, CollaboratorError>;

    /// One user message in, assistant text out.
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        self.invoke(&[Message::user(prompt)])
            .await
            .map(|r| r.content)
    }
}
