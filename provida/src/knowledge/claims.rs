//! Claim extraction: free text to (subject, predicate, object) triples.

use serde::{Deserialize, Serialize};

use crate::decode::{StructuredDecoder, StructuredOutput};

/// A factual triple awaiting verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Claim {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    fn is_complete(&self) -> bool {
        [&self.subject, &self.predicate, &self.object]
            .iter()
            .all(|s| !s.trim().is_empty())
    }
}

impl StructuredOutput for Claim {
    fn schema_hint() -> String {
        r#"{"subject": string, "predicate": UPPER_SNAKE_CASE verb phrase, "object": string}"#.into()
    }
}

fn extraction_prompt(text: &str) -> String {
    format!(
        "Extract every factual claim from the text below as a (subject, predicate, object) triple.\n\
         The predicate is a short uppercase verb phrase naming the relation, e.g. IS_A, CAUSES, TREATS, HAS_COMPLICATION.\n\
         Example: \"Sleeve gastrectomy, a type of bariatric surgery, can cause fistulas.\" gives\n\
         [{{\"subject\": \"sleeve gastrectomy\", \"predicate\": \"IS_A\", \"object\": \"bariatric surgery\"}},\n\
          {{\"subject\": \"sleeve gastrectomy\", \"predicate\": \"CAN_CAUSE\", \"object\": \"fistulas\"}}]\n\
         If there are no claims, return [].\n\n\
         --- TEXT ---\n{text}\n--- END ---"
    )
}

/// Turns text into claims through the gateway. Never fails: gateway or decode
/// errors yield an empty list.
///
/// **Interaction**: used by the deep-research `fact_check` node.
#[derive(Clone)]
pub struct ClaimExtractor {
    decoder: StructuredDecoder,
}

impl ClaimExtractor {
    pub fn new(decoder: StructuredDecoder) -> Self {
        Self { decoder }
    }

    pub async fn extract_claims(&self, text: &str) -> Vec<Claim> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.decoder.ask::<Vec<Claim>>(&extraction_prompt(text)).await {
            Ok(claims) => {
                let claims: Vec<Claim> = claims.into_iter().filter(Claim::is_complete).collect();
                tracing::info!(count = claims.len(), "claims extracted");
                claims
            }
            Err(e) => {
                tracing::warn!(error = %e, "claim extraction failed, treating text as claim-free");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use std::sync::Arc;

    fn extractor(llm: Arc<MockLlm>) -> ClaimExtractor {
        ClaimExtractor::new(StructuredDecoder::new(llm))
    }

    /// **Scenario**: Triples are decoded and incomplete ones dropped.
    #[tokio::test]
    async fn extracts_and_drops_incomplete() {
        let llm = Arc::new(MockLlm::with_content(
            r#"```json
[{"subject": "vitamin D", "predicate": "IMPROVES", "object": "bone density"},
 {"subject": "", "predicate": "IS_A", "object": "x"}]
```"#,
        ));
        let claims = extractor(llm).extract_claims("Vitamin D improves bone density.").await;
        assert_eq!(claims, vec![Claim::new("vitamin D", "IMPROVES", "bone density")]);
    }

    /// **Scenario**: Blank input makes no gateway call; gateway failure gives no claims.
    #[tokio::test]
    async fn blank_input_and_failures_yield_empty() {
        let llm = Arc::new(MockLlm::with_content("[]"));
        assert!(extractor(llm.clone()).extract_claims("   ").await.is_empty());
        assert_eq!(llm.call_count(), 0);

        let failing = Arc::new(MockLlm::failing("down"));
        assert!(extractor(failing).extract_claims("text").await.is_empty());
    }

    /// **Scenario**: Unrepairable output yields no claims after exactly one repair call.
    #[tokio::test]
    async fn garbage_yields_empty_after_one_repair() {
        let llm = Arc::new(MockLlm::with_content("I cannot do that."));
        assert!(extractor(llm.clone()).extract_claims("text").await.is_empty());
        assert_eq!(llm.call_count(), 2);
    }
}
