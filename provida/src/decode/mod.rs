//! Structured output decoding with one bounded repair attempt.
//!
//! A raw model response is parsed directly first. If that fails (bad JSON,
//! wrong shape, or [`StructuredOutput::validate`] rejects it), the gateway is
//! asked exactly once to repair its own output against the type's schema hint.
//! A second failure is a [`DecodeError::Malformed`]; callers turn it into their
//! sentinel value.

mod extract;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::CollaboratorError;
use crate::llm::LlmClient;
use crate::message::Message;

pub use extract::extract_json;

/// A type the gateway is asked to produce as JSON.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Shape description used in prompts and in the repair instruction.
    fn schema_hint() -> String;

    /// Semantic checks serde cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<T: StructuredOutput> StructuredOutput for Vec<T> {
    fn schema_hint() -> String {
        format!("a JSON array; each element is {}", T::schema_hint())
    }

    fn validate(&self) -> Result<(), String> {
        self.iter()
            .enumerate()
            .try_for_each(|(i, item)| item.validate().map_err(|e| format!("element {}: {}", i, e)))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Both the direct parse and the repaired output failed.
    #[error("malformed structured output: {first}; after repair: {second}")]
    Malformed { first: String, second: String },
    /// A gateway call made by the decoder failed.
    #[error("gateway failed while decoding: {0}")]
    Gateway(#[from] CollaboratorError),
}

/// Parses and validates `raw` as `T` without any repair.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T, String> {
    let value: T = serde_json::from_str(extract_json(raw)).map_err(|e| e.to_string())?;
    value.validate()?;
    Ok(value)
}

const REPAIR_SYSTEM: &str = "You fix malformed JSON. Reply with the corrected JSON only, no prose.";

fn repair_prompt(raw: &str, error: &str, schema: &str) -> String {
    format!(
        "The following output was supposed to be {schema}.\n\
         It failed to parse: {error}\n\n\
         Output:\n{raw}\n\n\
         Return only the corrected JSON."
    )
}

/// Decoder bound to the gateway used for its repair attempt.
///
/// **Interaction**: shared by the claim extractor, the search router and the
/// workflow nodes.
#[derive(Clone)]
pub struct StructuredDecoder {
    llm: Arc<dyn LlmClient>,
}

impl StructuredDecoder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Decodes `raw` into `T`, repairing at most once.
    pub async fn decode<T: StructuredOutput>(&self, raw: &str) -> Result<T, DecodeError> {
        let first = match parse_structured::<T>(raw) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        tracing::warn!(error = %first, "structured output did not parse, asking for one repair");
        let repaired = self
            .llm
            .invoke(&[
                Message::system(REPAIR_SYSTEM),
                Message::user(repair_prompt(raw, &first, &T::schema_hint())),
            ])
            .await?;
        parse_structured::<T>(&repaired.content).map_err(|second| {
            tracing::warn!(error = %second, "repaired output still malformed");
            DecodeError::Malformed { first, second }
        })
    }

    /// Sends `prompt` (with the schema hint appended) and decodes the answer.
    pub async fn ask<T: StructuredOutput>(&self, prompt: &str) -> Result<T, DecodeError> {
        let prompt = format!(
            "{prompt}\n\nRespond with {} and nothing else.",
            T::schema_hint()
        );
        let raw = self.llm.generate(&prompt).await?;
        self.decode(&raw).await
    }
}
