//! Therapeutic workflow:
//! `anamnesis → diagnosis → planning → verification → {planning | END}`.
//!
//! The verification loop is bounded by `max_replans`; see [`VerificationNode`].

mod nodes;
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use crate::decode::StructuredDecoder;
use crate::graph::{CompiledStateGraph, GraphDefinitionError, LoggingNodeMiddleware, StateGraph, END, START};
use crate::knowledge::KnowledgeGraphWriter;
use crate::memory::{Checkpointer, MemorySaver, RunnableConfig};
use crate::settings::WorkflowSettings;

use super::{Collaborators, WorkflowError};

pub use nodes::{
    AnamnesisNode, DiagnosisNode, PlanningNode, VerificationNode, ANAMNESIS, CORRECTION_PREFIX,
    DIAGNOSIS, PLANNING, VERIFICATION,
};
pub use state::{
    PlanOutcome, PlanVerification, ScoredPlan, StructuredPatientData, TherapeuticPatch,
    TherapeuticState,
};

const REPLAN: &str = "replan";
const DONE: &str = "end";

/// Builds the uncompiled therapeutic graph.
pub fn build_graph(
    collaborators: &Collaborators,
    settings: &WorkflowSettings,
) -> StateGraph<TherapeuticState> {
    let llm = collaborators.timed_llm(settings);
    let decoder = StructuredDecoder::new(llm.clone());
    let writer = KnowledgeGraphWriter::new(collaborators.graph.clone());

    let mut graph = StateGraph::<TherapeuticState>::new()
        .with_middleware(Arc::new(LoggingNodeMiddleware::<TherapeuticState>::default()));
    graph
        .add_node(ANAMNESIS, Arc::new(AnamnesisNode::new(decoder.clone(), writer.clone())))
        .add_node(DIAGNOSIS, Arc::new(DiagnosisNode::new(llm.clone(), writer)))
        .add_node(
            PLANNING,
            Arc::new(PlanningNode::new(
                llm,
                collaborators.vectors.clone(),
                settings.evidence_top_k,
            )),
        )
        .add_node(
            VERIFICATION,
            Arc::new(VerificationNode::new(decoder, settings.max_replans)),
        )
        .add_edge(START, ANAMNESIS)
        .add_edge(ANAMNESIS, DIAGNOSIS)
        .add_edge(DIAGNOSIS, PLANNING)
        .add_edge(PLANNING, VERIFICATION)
        .add_conditional_edges(
            VERIFICATION,
            [REPLAN, DONE],
            Arc::new(|s: &TherapeuticState| {
                if s.plan_outcome == Some(PlanOutcome::Replan) {
                    REPLAN.to_string()
                } else {
                    DONE.to_string()
                }
            }),
            Some(HashMap::from([
                (REPLAN.to_string(), PLANNING.to_string()),
                (DONE.to_string(), END.to_string()),
            ])),
        );
    graph
}

/// Entry point for one patient's plan.
///
/// **Interaction**: runs the compiled graph with run id = patient id, so
/// `resume` picks up a patient's interrupted run from its checkpoint.
pub struct TherapeuticWorkflow {
    graph: CompiledStateGraph<TherapeuticState>,
    max_replans: usize,
}

impl TherapeuticWorkflow {
    /// Compiles the graph with an in-memory checkpointer.
    pub fn new(
        collaborators: Collaborators,
        settings: WorkflowSettings,
    ) -> Result<Self, GraphDefinitionError> {
        Self::with_checkpointer(collaborators, settings, Arc::new(MemorySaver::<TherapeuticState>::new()))
    }

    pub fn with_checkpointer(
        collaborators: Collaborators,
        settings: WorkflowSettings,
        checkpointer: Arc<dyn Checkpointer<TherapeuticState>>,
    ) -> Result<Self, GraphDefinitionError> {
        let graph = build_graph(&collaborators, &settings).compile_with_checkpointer(checkpointer)?;
        Ok(Self {
            graph,
            max_replans: settings.max_replans,
        })
    }

    pub fn graph(&self) -> &CompiledStateGraph<TherapeuticState> {
        &self.graph
    }

    /// Three straight nodes plus two per planning round, with headroom.
    fn run_config(&self, patient_id: &str) -> RunnableConfig {
        let needed = 3 + 2 * (self.max_replans as u64 + 1);
        RunnableConfig::for_thread(patient_id).with_recursion_limit(needed.max(64))
    }

    pub async fn run(
        &self,
        patient_id: &str,
        raw_patient_data: &str,
    ) -> Result<TherapeuticState, WorkflowError<TherapeuticState>> {
        tracing::info!(patient_id, "therapeutic workflow started");
        let state = TherapeuticState::new(patient_id, raw_patient_data);
        let out = self
            .graph
            .invoke(state, Some(self.run_config(patient_id)))
            .await?;
        tracing::info!(
            patient_id,
            outcome = ?out.plan_outcome,
            replans = out.replans_taken(),
            "therapeutic workflow finished"
        );
        Ok(out)
    }

    /// Continues the patient's last interrupted run.
    pub async fn resume(&self, patient_id: &str) -> Result<TherapeuticState, WorkflowError<TherapeuticState>> {
        Ok(self.graph.resume(self.run_config(patient_id)).await?)
    }
}
