//! Deep-research workflow:
//! `plan → collect → analyze → update_kg → synthesize → fact_check → END`.

mod bootstrap;
mod nodes;
mod state;

use std::sync::Arc;

use crate::decode::StructuredDecoder;
use crate::graph::{CompiledStateGraph, GraphDefinitionError, LoggingNodeMiddleware, StateGraph, END, START};
use crate::knowledge::{
    ClaimExtractor, KnowledgeGraphWriter, KnowledgeIngestor, KnowledgeVerifier,
    SemanticDuplicateGate,
};
use crate::memory::{Checkpointer, MemorySaver, RunnableConfig};
use crate::search::SearchRouter;
use crate::settings::WorkflowSettings;

use super::{Collaborators, WorkflowError};

pub use bootstrap::{BootstrapReport, KnowledgeBootstrap, SeedArticle, BOOTSTRAP_TOPIC};
pub use nodes::{
    AnalyzeNode, CollectNode, FactCheckNode, PlanNode, SynthesizeNode, UpdateKnowledgeGraphNode,
    ANALYZE, COLLECT, FACT_CHECK, HITS_PER_QUESTION, PLAN, SYNTHESIZE, UPDATE_KG,
};
pub use state::{
    AnalysisResult, AnalyzedItem, CollectedItem, EvidenceLevel, FinalReport, ResearchPatch,
    ResearchPlan, ResearchQuestion, ResearchState,
};

/// The `update_kg` node: gated ingestion plus analysis upserts.
fn update_kg_node(collaborators: &Collaborators, settings: &WorkflowSettings) -> UpdateKnowledgeGraphNode {
    let ingestor = KnowledgeIngestor::new(collaborators.vectors.clone(), collaborators.graph.clone())
        .with_gate(
            SemanticDuplicateGate::new(collaborators.vectors.clone())
                .with_threshold(settings.semantic_similarity_threshold),
        )
        .with_chunking(settings.chunk_size, settings.chunk_overlap);
    UpdateKnowledgeGraphNode::new(ingestor, KnowledgeGraphWriter::new(collaborators.graph.clone()))
}

/// Builds the uncompiled deep-research graph. The router's own timeout is
/// replaced by `settings.search_timeout()`.
pub fn build_graph(
    collaborators: &Collaborators,
    router: SearchRouter,
    settings: &WorkflowSettings,
) -> StateGraph<ResearchState> {
    let llm = collaborators.timed_llm(settings);
    let decoder = StructuredDecoder::new(llm);
    let router = Arc::new(router.with_timeout(settings.search_timeout()));
    let verifier = KnowledgeVerifier::new(collaborators.graph.clone())
        .with_concurrency(settings.fan_out_concurrency);

    let mut graph = StateGraph::<ResearchState>::new()
        .with_middleware(Arc::new(LoggingNodeMiddleware::<ResearchState>::default()));
    graph
        .add_node(PLAN, Arc::new(PlanNode::new(decoder.clone())))
        .add_node(
            COLLECT,
            Arc::new(CollectNode::new(router, settings.fan_out_concurrency)),
        )
        .add_node(
            ANALYZE,
            Arc::new(AnalyzeNode::new(decoder.clone(), settings.fan_out_concurrency)),
        )
        .add_node(UPDATE_KG, Arc::new(update_kg_node(collaborators, settings)))
        .add_node(SYNTHESIZE, Arc::new(SynthesizeNode::new(decoder.clone())))
        .add_node(
            FACT_CHECK,
            Arc::new(FactCheckNode::new(ClaimExtractor::new(decoder), verifier)),
        )
        .add_edge(START, PLAN)
        .add_edge(PLAN, COLLECT)
        .add_edge(COLLECT, ANALYZE)
        .add_edge(ANALYZE, UPDATE_KG)
        .add_edge(UPDATE_KG, SYNTHESIZE)
        .add_edge(SYNTHESIZE, FACT_CHECK)
        .add_edge(FACT_CHECK, END);
    graph
}

/// Entry point for a research topic.
///
/// **Interaction**: every run gets a fresh run id (`research-<uuid>`), which is
/// logged and can be passed to `resume`. With the default in-memory
/// checkpointer, finished runs are pruned after each call; failed runs stay
/// resumable.
pub struct DeepResearchWorkflow {
    graph: CompiledStateGraph<ResearchState>,
    default_search_limit: usize,
    memory: Option<Arc<MemorySaver<ResearchState>>>,
}

impl DeepResearchWorkflow {
    /// Compiles the graph with an in-memory checkpointer.
    pub fn new(
        collaborators: Collaborators,
        router: SearchRouter,
        settings: WorkflowSettings,
    ) -> Result<Self, GraphDefinitionError> {
        let memory = Arc::new(MemorySaver::<ResearchState>::new());
        let mut workflow = Self::with_checkpointer(collaborators, router, settings, memory.clone())?;
        workflow.memory = Some(memory);
        Ok(workflow)
    }

    pub fn with_checkpointer(
        collaborators: Collaborators,
        router: SearchRouter,
        settings: WorkflowSettings,
        checkpointer: Arc<dyn Checkpointer<ResearchState>>,
    ) -> Result<Self, GraphDefinitionError> {
        let graph = build_graph(&collaborators, router, &settings).compile_with_checkpointer(checkpointer)?;
        Ok(Self {
            graph,
            default_search_limit: settings.default_search_limit,
            memory: None,
        })
    }

    pub fn graph(&self) -> &CompiledStateGraph<ResearchState> {
        &self.graph
    }

    /// Researches `topic`, searching at most `search_limit` questions
    /// (the configured default when `None`).
    pub async fn run(
        &self,
        topic: &str,
        search_limit: Option<usize>,
    ) -> Result<ResearchState, WorkflowError<ResearchState>> {
        let run_id = format!("research-{}", uuid::Uuid::new_v4());
        self.run_with_id(&run_id, topic, search_limit).await
    }

    /// `run` under a caller-chosen run id.
    pub async fn run_with_id(
        &self,
        run_id: &str,
        topic: &str,
        search_limit: Option<usize>,
    ) -> Result<ResearchState, WorkflowError<ResearchState>> {
        let limit = search_limit.unwrap_or(self.default_search_limit);
        tracing::info!(run_id, topic, search_limit = limit, "deep research started");
        let out = self
            .graph
            .invoke(ResearchState::new(topic, limit), Some(RunnableConfig::for_thread(run_id)))
            .await?;
        let report = out.verification_report.as_ref();
        tracing::info!(
            run_id,
            sources = out.analyzed.len(),
            hallucination = report.is_some_and(|r| r.hallucination_detected),
            "deep research finished"
        );
        self.prune_finished().await;
        Ok(out)
    }

    pub async fn resume(&self, run_id: &str) -> Result<ResearchState, WorkflowError<ResearchState>> {
        let out = self.graph.resume(RunnableConfig::for_thread(run_id)).await?;
        self.prune_finished().await;
        Ok(out)
    }

    /// Runs held by the default in-memory checkpointer; `None` with a caller-supplied one.
    pub async fn retained_runs(&self) -> Option<usize> {
        match &self.memory {
            Some(memory) => Some(memory.thread_count().await),
            None => None,
        }
    }

    async fn prune_finished(&self) {
        if let Some(memory) = &self.memory {
            memory.prune_finished().await;
        }
    }
}
