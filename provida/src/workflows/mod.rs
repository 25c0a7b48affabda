//! The two clinical workflows built on the graph engine.
//!
//! - [`therapeutic`]: anamnesis, diagnosis, planning and a bounded
//!   verification/replanning loop for one patient.
//! - [`research`]: plan, collect, analyze, write to the knowledge graph,
//!   synthesize and fact-check a research topic.
//!
//! Both take their collaborators explicitly through [`Collaborators`]; nothing
//! is read from globals.

pub mod research;
pub mod therapeutic;

use std::sync::Arc;

use thiserror::Error;

use crate::channels::GraphState;
use crate::graph::{GraphDefinitionError, RunError};
use crate::graph_db::GraphDatabase;
use crate::llm::{LlmClient, TimeoutLlm};
use crate::settings::WorkflowSettings;
use crate::vector::{InMemoryVectorStore, VectorStore};

pub use research::{BootstrapReport, DeepResearchWorkflow, KnowledgeBootstrap, ResearchState, SeedArticle};
pub use therapeutic::{TherapeuticState, TherapeuticWorkflow};

/// Failure at the workflow facade.
#[derive(Debug, Error)]
pub enum WorkflowError<S>
where
    S: GraphState,
{
    #[error("workflow graph is miswired: {0}")]
    Definition(#[from] GraphDefinitionError),
    #[error(transparent)]
    Run(#[from] RunError<S>),
}

/// Collaborator handles shared by both workflows.
#[derive(Clone)]
pub struct Collaborators {
    pub llm: Arc<dyn LlmClient>,
    pub graph: Arc<dyn GraphDatabase>,
    pub vectors: Arc<dyn VectorStore>,
}

impl Collaborators {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        graph: Arc<dyn GraphDatabase>,
        vectors: Arc<dyn VectorStore>,
    ) -> Self {
        Self { llm, graph, vectors }
    }

    /// An in-process vector store over the embedder the settings select.
    pub fn with_in_memory_vectors(
        llm: Arc<dyn LlmClient>,
        graph: Arc<dyn GraphDatabase>,
        settings: &WorkflowSettings,
    ) -> Self {
        let vectors = Arc::new(InMemoryVectorStore::new(settings.embedder()));
        Self::new(llm, graph, vectors)
    }

    /// The gateway wrapped with the configured LLM timeout.
    pub(crate) fn timed_llm(&self, settings: &WorkflowSettings) -> Arc<dyn LlmClient> {
        Arc::new(TimeoutLlm::new(self.llm.clone(), settings.llm_timeout()))
    }
}
