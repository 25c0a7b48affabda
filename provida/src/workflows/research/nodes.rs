//! Nodes of the deep-research graph.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::channels::Overwrite;
use crate::decode::{StructuredDecoder, StructuredOutput};
use crate::error::AgentError;
use crate::graph::{fan_out, Node};
use crate::knowledge::{ClaimExtractor, KnowledgeGraphWriter, KnowledgeIngestor, KnowledgeVerifier, VerificationReport};
use crate::search::{SearchHit, SearchRouter};

use super::state::{
    AnalysisResult, AnalyzedItem, CollectedItem, FinalReport, ResearchPatch, ResearchPlan,
    ResearchState,
};

pub const PLAN: &str = "plan";
pub const COLLECT: &str = "collect";
pub const ANALYZE: &str = "analyze";
pub const UPDATE_KG: &str = "update_kg";
pub const SYNTHESIZE: &str = "synthesize";
pub const FACT_CHECK: &str = "fact_check";

/// Hits requested from a tool for one research question.
pub const HITS_PER_QUESTION: usize = 5;

/// Breaks the topic into research questions with search queries.
pub struct PlanNode {
    decoder: StructuredDecoder,
}

impl PlanNode {
    pub fn new(decoder: StructuredDecoder) -> Self {
        Self { decoder }
    }
}

#[async_trait]
impl Node<ResearchState> for PlanNode {
    fn id(&self) -> &str {
        PLAN
    }

    async fn run(&self, state: ResearchState) -> Result<ResearchPatch, AgentError> {
        let prompt = format!(
            "You plan clinical literature research. Break the topic below into focused \
             research questions, each with a search query suitable for a web or PubMed search.\n\n\
             Topic: {}",
            state.topic
        );
        let plan = match self.decoder.ask::<ResearchPlan>(&prompt).await {
            Ok(mut plan) => {
                if plan.research_topic.trim().is_empty() {
                    plan.research_topic = state.topic.clone();
                }
                plan
            }
            Err(e) => {
                tracing::warn!(topic = %state.topic, error = %e, "research plan unavailable, continuing with an empty plan");
                ResearchPlan::empty(&state.topic)
            }
        };
        tracing::info!(questions = plan.research_questions.len(), "research planned");
        Ok(ResearchPatch {
            plan: Overwrite::set(Some(plan)),
            ..Default::default()
        })
    }
}

fn to_item(hit: &SearchHit, tool: &str) -> Option<CollectedItem> {
    Some(CollectedItem {
        source_identifier: hit.source_identifier()?.to_string(),
        content: hit.body()?.to_string(),
        tool: tool.to_string(),
    })
}

/// Searches every planned question (up to the state's limit) concurrently.
pub struct CollectNode {
    router: Arc<SearchRouter>,
    concurrency: usize,
}

impl CollectNode {
    pub fn new(router: Arc<SearchRouter>, concurrency: usize) -> Self {
        Self { router, concurrency }
    }
}

#[async_trait]
impl Node<ResearchState> for CollectNode {
    fn id(&self) -> &str {
        COLLECT
    }

    async fn run(&self, state: ResearchState) -> Result<ResearchPatch, AgentError> {
        let questions = state
            .plan
            .map(|p| p.research_questions)
            .unwrap_or_default()
            .into_iter()
            .take(state.search_limit);
        let per_question = fan_out(questions, self.concurrency, |q| async move {
            match self.router.search(&q.search_query, HITS_PER_QUESTION).await {
                Ok((tool, hits)) => hits.iter().filter_map(|h| to_item(h, &tool)).collect::<Vec<_>>(),
                Err(e) => {
                    tracing::warn!(query = %q.search_query, error = %e, "search failed, question yields nothing");
                    Vec::new()
                }
            }
        })
        .await;
        let collected: Vec<CollectedItem> = per_question.into_iter().flatten().collect();
        tracing::info!(items = collected.len(), "sources collected");
        Ok(ResearchPatch {
            collected: Overwrite::set(collected),
            ..Default::default()
        })
    }
}

fn analysis_prompt(topic: &str, item: &CollectedItem) -> String {
    format!(
        "Analyse the source below for the research topic \"{topic}\".\n\
         Summarise its main findings and conclusions, classify the strength of its evidence \
         (A: systematic reviews or meta-analyses of RCTs; B: individual RCTs; C: cohort or \
         case-control studies; D: case series or expert opinion; E: no usable evidence), \
         justify the level and list relevant keywords.\n\n\
         Source: {}\n--- CONTENT ---\n{}\n--- END ---",
        item.source_identifier, item.content
    )
}

/// Grades every collected item concurrently; failures become flagged level-E sentinels.
pub struct AnalyzeNode {
    decoder: StructuredDecoder,
    concurrency: usize,
}

impl AnalyzeNode {
    pub fn new(decoder: StructuredDecoder, concurrency: usize) -> Self {
        Self { decoder, concurrency }
    }
}

#[async_trait]
impl Node<ResearchState> for AnalyzeNode {
    fn id(&self) -> &str {
        ANALYZE
    }

    async fn run(&self, state: ResearchState) -> Result<ResearchPatch, AgentError> {
        let topic = state.topic.as_str();
        let analyzed = fan_out(state.collected.clone(), self.concurrency, |item: CollectedItem| async move {
            match self.decoder.ask::<AnalysisResult>(&analysis_prompt(topic, &item)).await {
                Ok(analysis) => AnalyzedItem {
                    source_identifier: item.source_identifier.clone(),
                    analysis,
                    failed: false,
                },
                Err(e) => {
                    tracing::warn!(source = %item.source_identifier, error = %e, "analysis failed");
                    AnalyzedItem {
                        source_identifier: item.source_identifier.clone(),
                        analysis: AnalysisResult::sentinel(format!("analysis failed: {}", e)),
                        failed: true,
                    }
                }
            }
        })
        .await;
        Ok(ResearchPatch {
            analyzed: Overwrite::set(analyzed),
            ..Default::default()
        })
    }
}

/// Ingests analysed sources and writes their analyses to the graph.
/// Side effect only; every failure is logged and skipped.
pub struct UpdateKnowledgeGraphNode {
    ingestor: KnowledgeIngestor,
    writer: KnowledgeGraphWriter,
}

impl UpdateKnowledgeGraphNode {
    pub fn new(ingestor: KnowledgeIngestor, writer: KnowledgeGraphWriter) -> Self {
        Self { ingestor, writer }
    }
}

#[async_trait]
impl Node<ResearchState> for UpdateKnowledgeGraphNode {
    fn id(&self) -> &str {
        UPDATE_KG
    }

    async fn run(&self, state: ResearchState) -> Result<ResearchPatch, AgentError> {
        // analyzed[i] belongs to collected[i]
        for (item, analyzed) in state.collected.iter().zip(&state.analyzed) {
            if analyzed.failed {
                continue;
            }
            let id = item.source_identifier.as_str();
            match self.ingestor.ingest(id, &item.content).await {
                Ok(outcome) => tracing::debug!(source = id, ?outcome, "ingestion"),
                Err(e) => tracing::warn!(source = id, error = %e, "ingestion failed"),
            }
            let a = &analyzed.analysis;
            if let Err(e) = self
                .writer
                .upsert_analysis(&state.topic, id, &a.summary, a.evidence_level.as_str(), &a.keywords)
                .await
            {
                tracing::warn!(source = id, error = %e, "analysis upsert failed");
            }
        }
        Ok(ResearchPatch::default())
    }
}

#[derive(Debug, Deserialize)]
struct SynthesisOutput {
    summary: Option<String>,
    #[serde(default)]
    citations_used: Vec<String>,
}

impl StructuredOutput for SynthesisOutput {
    fn schema_hint() -> String {
        r#"a JSON object {"summary": string or null, "citations_used": [source id]}"#.into()
    }
}

fn inline_citation() -> Option<&'static Regex> {
    static CITATION: OnceLock<Option<Regex>> = OnceLock::new();
    CITATION
        .get_or_init(|| Regex::new(r"\[([^\[\]]+)\]").ok())
        .as_ref()
}

/// Citations listed by the model plus those written inline, restricted to
/// `known` sources, first occurrence order.
fn collect_citations(summary: &str, listed: &[String], known: &HashSet<&str>) -> Vec<String> {
    let inline = inline_citation()
        .into_iter()
        .flat_map(|re| re.captures_iter(summary))
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()));
    let mut seen = HashSet::new();
    listed
        .iter()
        .map(|s| s.trim().to_string())
        .chain(inline)
        .filter(|id| known.contains(id.as_str()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Writes the cited summary, or refuses with a reason.
pub struct SynthesizeNode {
    decoder: StructuredDecoder,
}

impl SynthesizeNode {
    pub fn new(decoder: StructuredDecoder) -> Self {
        Self { decoder }
    }
}

#[async_trait]
impl Node<ResearchState> for SynthesizeNode {
    fn id(&self) -> &str {
        SYNTHESIZE
    }

    async fn run(&self, state: ResearchState) -> Result<ResearchPatch, AgentError> {
        let usable: Vec<&AnalyzedItem> = state.analyzed.iter().filter(|a| !a.failed).collect();
        let report = if usable.is_empty() {
            FinalReport::refused("no analyzed sources")
        } else {
            let sources: String = usable
                .iter()
                .map(|a| {
                    format!(
                        "[{}] (evidence {}) {}\n",
                        a.source_identifier, a.analysis.evidence_level, a.analysis.summary
                    )
                })
                .collect();
            let prompt = format!(
                "Answer the research topic \"{}\" using only the sources below. Cite every \
                 sentence with the [source id] it relies on. If the sources do not support an \
                 answer, set summary to null.\n\n{}",
                state.topic, sources
            );
            match self.decoder.ask::<SynthesisOutput>(&prompt).await {
                Ok(out) => match out.summary.filter(|s| !s.trim().is_empty()) {
                    Some(summary) => {
                        let known: HashSet<&str> =
                            usable.iter().map(|a| a.source_identifier.as_str()).collect();
                        let citations_used = collect_citations(&summary, &out.citations_used, &known);
                        FinalReport {
                            summary: Some(summary),
                            citations_used,
                            failure_reason: None,
                        }
                    }
                    None => FinalReport::refused("no source supports an answer"),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "synthesis failed");
                    FinalReport::refused(format!("synthesis failed: {}", e))
                }
            }
        };
        if let Some(reason) = &report.failure_reason {
            tracing::info!(reason = %reason, "synthesis refused");
        }
        Ok(ResearchPatch {
            final_report: Overwrite::set(Some(report)),
            ..Default::default()
        })
    }
}

/// Extracts claims from the summary and verifies them against the graph.
pub struct FactCheckNode {
    extractor: ClaimExtractor,
    verifier: KnowledgeVerifier,
}

impl FactCheckNode {
    pub fn new(extractor: ClaimExtractor, verifier: KnowledgeVerifier) -> Self {
        Self { extractor, verifier }
    }
}

#[async_trait]
impl Node<ResearchState> for FactCheckNode {
    fn id(&self) -> &str {
        FACT_CHECK
    }

    async fn run(&self, state: ResearchState) -> Result<ResearchPatch, AgentError> {
        let summary = state.final_report.as_ref().and_then(|r| r.summary.as_deref());
        let report = match summary {
            None => VerificationReport::with_message("no summary to verify"),
            Some(summary) => {
                let claims = self.extractor.extract_claims(summary).await;
                if claims.is_empty() {
                    VerificationReport::with_message("no claims extracted")
                } else {
                    self.verifier.bulk_verify(&claims).await
                }
            }
        };
        Ok(ResearchPatch {
            verification_report: Overwrite::set(Some(report)),
            ..Default::default()
        })
    }
}
