//! # Provida
//!
//! Clinical-research workflow graphs with knowledge-graph verification.
//!
//! A small stateful graph engine runs two workflows over injected
//! collaborators (LLM gateway, vector store, graph database, search tools):
//!
//! - **Therapeutic**: anamnesis → diagnosis → planning → verification, with a
//!   bounded replanning loop. See [`TherapeuticWorkflow`].
//! - **Deep research**: plan → collect → analyze → update_kg → synthesize →
//!   fact_check. See [`DeepResearchWorkflow`].
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], conditional
//!   edges, [`fan_out`], run errors and resume.
//! - [`channels`]: [`GraphState`], per-field merge policies ([`Overwrite`], [`Append`]).
//! - [`memory`]: checkpoints ([`Checkpointer`], [`MemorySaver`], [`SqliteSaver`]).
//! - [`llm`]: [`LlmClient`], [`ChatOpenAI`], [`MockLlm`], [`TimeoutLlm`].
//! - [`decode`]: [`StructuredDecoder`], structured output with one repair attempt.
//! - [`vector`], [`graph_db`], [`search`]: collaborator traits and bundled implementations.
//! - [`knowledge`]: claim extraction, verification, duplicate gate, ingestion, graph writes,
//!   [`RagQuery`] answers over ingested chunks.
//! - [`workflows`]: the two workflows, plus [`KnowledgeBootstrap`] for seeding the knowledge base.
//! - [`settings`]: [`WorkflowSettings`] (defaults, `[workflow]` TOML table, `PROVIDA_*` env).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use provida::{
//!     Collaborators, HashEmbedder, InMemoryGraph, InMemoryVectorStore, MockLlm,
//!     TherapeuticWorkflow, WorkflowSettings,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let collaborators = Collaborators::new(
//!     Arc::new(MockLlm::with_content("{}")),
//!     Arc::new(InMemoryGraph::new()),
//!     Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::default()))),
//! );
//! let workflow = TherapeuticWorkflow::new(collaborators, WorkflowSettings::default())?;
//! let state = workflow.run("patient-42", "Ana, 54 years, BMI 31, HbA1c 7.9").await?;
//! println!("{:?}", state.plan_outcome);
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod decode;
pub mod error;
pub mod graph;
pub mod graph_db;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod message;
pub mod search;
pub mod settings;
pub mod vector;
pub mod workflows;

pub use channels::{Append, GraphState, MergeUpdater, Overwrite, StateUpdater};
pub use decode::{DecodeError, StructuredDecoder, StructuredOutput};
pub use error::{AgentError, CollaboratorError};
pub use graph::{
    fan_out, CancellationToken, CompiledStateGraph, GraphDefinitionError, LoggingNodeMiddleware,
    Node, NodeMiddleware, RunAbortedError, RunContext, RunError, StateGraph, END, START,
};
pub use graph_db::{GraphDatabase, InMemoryGraph, Neo4jHttpGraph, Record, Statement, StatementKind};
pub use knowledge::{
    Claim, ClaimExtractor, IngestOutcome, KnowledgeGraphWriter, KnowledgeIngestor,
    KnowledgeVerifier, RagAnswer, RagError, RagQuery, SemanticDuplicateGate, VerificationReport,
};
pub use llm::{ChatOpenAI, LlmClient, LlmResponse, LlmUsage, MockLlm, TimeoutLlm};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointMetadata, CheckpointSource, Checkpointer,
    JsonSerializer, MemorySaver, RunnableConfig, SqliteSaver,
};
pub use message::Message;
pub use search::{BraveSearch, PubMedSearch, SearchHit, SearchRouter, SearchTool, StaticSearch};
pub use settings::WorkflowSettings;
pub use vector::{
    Embedder, HashEmbedder, InMemoryVectorStore, OpenAIEmbedder, VectorHit, VectorStore,
};
pub use workflows::{
    BootstrapReport, Collaborators, DeepResearchWorkflow, KnowledgeBootstrap, ResearchState,
    SeedArticle, TherapeuticState, TherapeuticWorkflow, WorkflowError,
};
