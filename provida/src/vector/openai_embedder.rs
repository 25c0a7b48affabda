//! OpenAI Embeddings implementation of [`Embedder`].
//!
//! Reads `OPENAI_API_KEY` unless an explicit config is given. Used when
//! `WorkflowSettings::embedding_model` is set, so the duplicate gate and
//! evidence search compare meaning rather than shared tokens.

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::vector::Embedder;

/// OpenAI-compatible embeddings client.
///
/// **Interaction**: implements `Embedder`; wrapped by `InMemoryVectorStore`
/// through `Collaborators::with_in_memory_vectors`.
pub struct OpenAIEmbedder {
    config: OpenAIConfig,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Default config (API key from `OPENAI_API_KEY`).
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), model)
    }

    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimensions = Self::model_dimensions(&model);
        Self {
            config,
            model,
            dimensions,
        }
    }

    fn model_dimensions(model: &str) -> usize {
        match model {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CollaboratorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let input = match texts {
            [one] => EmbeddingInput::String(one.to_string()),
            many => EmbeddingInput::StringArray(many.iter().map(|s| s.to_string()).collect()),
        };
        let request = CreateEmbeddingRequest {
            input,
            model: self.model.clone(),
            ..Default::default()
        };

        let response = Client::with_config(self.config.clone())
            .embeddings()
            .create(request)
            .await
            .map_err(|e| CollaboratorError::Embedding(format!("OpenAI API error: {}", e)))?;

        let mut data = response.data;
        if data.len() != texts.len() {
            return Err(CollaboratorError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        data.sort_by_key(|e| e.index);
        tracing::trace!(model = %self.model, count = data.len(), "texts embedded");
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }
}
