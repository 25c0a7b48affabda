//! Shared fixtures for workflow integration tests: in-memory collaborators
//! and a prompt-driven mock gateway.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use provida::{
    Collaborators, HashEmbedder, InMemoryGraph, InMemoryVectorStore, MockLlm, SearchHit,
    WorkflowSettings,
};

pub struct Fixture {
    pub llm: Arc<MockLlm>,
    pub graph: Arc<InMemoryGraph>,
    pub vectors: Arc<InMemoryVectorStore>,
}

impl Fixture {
    pub fn new(llm: MockLlm) -> Self {
        Self {
            llm: Arc::new(llm),
            graph: Arc::new(InMemoryGraph::new()),
            vectors: Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::default()))),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(self.llm.clone(), self.graph.clone(), self.vectors.clone())
    }
}

/// Defaults with the replanning budget overridden.
pub fn settings(max_replans: usize) -> WorkflowSettings {
    WorkflowSettings {
        max_replans,
        ..WorkflowSettings::default()
    }
}

pub const PATIENT_JSON: &str =
    r#"{"name": "Ana Souza", "age": 54, "bmi": 31.2, "hba1c": 7.9, "notes": "sedentary"}"#;

pub fn verdict(score: f64, safe: bool) -> String {
    format!(
        r#"{{"confidence_score": {}, "notes": "confidence {}", "is_safe_to_proceed": {}}}"#,
        score, score, safe
    )
}

/// Gateway for the therapeutic workflow. Reviews come from `verdicts` in
/// order (the last repeats); plans are numbered `Plan v1`, `Plan v2`, ...
pub fn clinic_llm(intake: &'static str, verdicts: Vec<String>) -> MockLlm {
    let plans = AtomicUsize::new(0);
    let reviews = AtomicUsize::new(0);
    MockLlm::from_fn(move |prompt| {
        if prompt.contains("clinical intake assistant") {
            intake.to_string()
        } else if prompt.contains("obesity stage") {
            "Class I obesity with poorly controlled type 2 diabetes.".to_string()
        } else if prompt.contains("multimodal treatment plan") {
            format!("Plan v{}", plans.fetch_add(1, Ordering::SeqCst) + 1)
        } else if prompt.contains("Review the proposed treatment plan") {
            let i = reviews.fetch_add(1, Ordering::SeqCst);
            verdicts
                .get(i)
                .or_else(|| verdicts.last())
                .cloned()
                .unwrap_or_default()
        } else {
            "unexpected prompt".to_string()
        }
    })
}

pub fn hit(url: &str, content: &str) -> SearchHit {
    SearchHit {
        url: Some(url.to_string()),
        title: None,
        content: Some(content.to_string()),
        snippet: None,
    }
}
