//! Deep-research state and the records its nodes produce.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channels::{GraphState, Overwrite};
use crate::decode::StructuredOutput;
use crate::knowledge::VerificationReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuestion {
    pub question: String,
    pub search_query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub research_topic: String,
    #[serde(default)]
    pub research_questions: Vec<ResearchQuestion>,
}

impl ResearchPlan {
    pub fn empty(topic: impl Into<String>) -> Self {
        Self {
            research_topic: topic.into(),
            research_questions: Vec::new(),
        }
    }
}

impl StructuredOutput for ResearchPlan {
    fn schema_hint() -> String {
        r#"a JSON object {"research_topic": string, "research_questions": [{"question": string, "search_query": string}]}"#
            .into()
    }

    fn validate(&self) -> Result<(), String> {
        match self
            .research_questions
            .iter()
            .position(|q| q.search_query.trim().is_empty())
        {
            Some(i) => Err(format!("question {} has an empty search_query", i)),
            None => Ok(()),
        }
    }
}

/// One retrieved document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedItem {
    /// URL of the hit, or its title when it has no URL.
    pub source_identifier: String,
    pub content: String,
    /// Name of the search tool that returned it.
    pub tool: String,
}

/// GRADE-style strength of evidence, `A` strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvidenceLevel {
    A,
    B,
    C,
    D,
    E,
}

impl EvidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        }
    }
}

impl fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub evidence_level: EvidenceLevel,
    pub justification: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl AnalysisResult {
    /// Stand-in for an analysis that could not be produced.
    pub fn sentinel(reason: impl Into<String>) -> Self {
        Self {
            summary: String::new(),
            evidence_level: EvidenceLevel::E,
            justification: reason.into(),
            keywords: Vec::new(),
        }
    }
}

impl StructuredOutput for AnalysisResult {
    fn schema_hint() -> String {
        r#"a JSON object {"summary": string, "evidence_level": one of "A","B","C","D","E", "justification": string, "keywords": [string]}"#
            .into()
    }

    fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            Err("summary is empty".into())
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedItem {
    pub source_identifier: String,
    pub analysis: AnalysisResult,
    /// Set when `analysis` is the sentinel.
    pub failed: bool,
}

/// Cited summary, or the reason none was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub summary: Option<String>,
    pub citations_used: Vec<String>,
    pub failure_reason: Option<String>,
}

impl FinalReport {
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            summary: None,
            citations_used: Vec::new(),
            failure_reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    pub topic: String,
    /// Maximum number of research questions searched.
    pub search_limit: usize,
    pub plan: Option<ResearchPlan>,
    pub collected: Vec<CollectedItem>,
    pub analyzed: Vec<AnalyzedItem>,
    pub final_report: Option<FinalReport>,
    pub verification_report: Option<VerificationReport>,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>, search_limit: usize) -> Self {
        Self {
            topic: topic.into(),
            search_limit,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct ResearchPatch {
    pub plan: Overwrite<Option<ResearchPlan>>,
    pub collected: Overwrite<Vec<CollectedItem>>,
    pub analyzed: Overwrite<Vec<AnalyzedItem>>,
    pub final_report: Overwrite<Option<FinalReport>>,
    pub verification_report: Overwrite<Option<VerificationReport>>,
}

impl GraphState for ResearchState {
    type Patch = ResearchPatch;

    fn merge(&mut self, patch: ResearchPatch) {
        patch.plan.merge_into(&mut self.plan);
        patch.collected.merge_into(&mut self.collected);
        patch.analyzed.merge_into(&mut self.analyzed);
        patch.final_report.merge_into(&mut self.final_report);
        patch.verification_report.merge_into(&mut self.verification_report);
    }
}
