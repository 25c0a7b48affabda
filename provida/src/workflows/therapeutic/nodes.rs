//! Nodes of the therapeutic graph.
//!
//! Every node turns collaborator and decode failures into an `error_*` field or
//! a sentinel and lets the run continue; none of them returns `Err`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::{Append, Overwrite};
use crate::decode::StructuredDecoder;
use crate::error::AgentError;
use crate::graph::Node;
use crate::knowledge::KnowledgeGraphWriter;
use crate::llm::LlmClient;
use crate::vector::{VectorHit, VectorStore};

use super::state::{
    PlanOutcome, PlanVerification, ScoredPlan, StructuredPatientData, TherapeuticPatch,
    TherapeuticState,
};

pub const ANAMNESIS: &str = "anamnesis";
pub const DIAGNOSIS: &str = "diagnosis";
pub const PLANNING: &str = "planning";
pub const VERIFICATION: &str = "verification";

/// Prefix of every replanning instruction.
pub const CORRECTION_PREFIX: &str = "Correction required: ";

fn anamnesis_prompt(raw: &str) -> String {
    format!(
        "You are a clinical intake assistant. Extract the patient's name, age, \
         body-mass index (bmi), HbA1c and any other relevant notes from the record below.\n\n\
         --- RECORD ---\n{raw}\n--- END ---"
    )
}

fn describe_patient(data: &StructuredPatientData) -> String {
    format!(
        "Name: {}\nAge: {}\nBMI: {:.1}\nHbA1c: {:.1}%\nNotes: {}",
        data.name, data.age, data.bmi, data.hba1c, data.notes
    )
}

/// Decodes the raw intake and upserts the patient node.
pub struct AnamnesisNode {
    decoder: StructuredDecoder,
    writer: KnowledgeGraphWriter,
}

impl AnamnesisNode {
    pub fn new(decoder: StructuredDecoder, writer: KnowledgeGraphWriter) -> Self {
        Self { decoder, writer }
    }
}

#[async_trait]
impl Node<TherapeuticState> for AnamnesisNode {
    fn id(&self) -> &str {
        ANAMNESIS
    }

    async fn run(&self, state: TherapeuticState) -> Result<TherapeuticPatch, AgentError> {
        if state.patient_data.trim().is_empty() {
            return Ok(TherapeuticPatch {
                error_anamnesis: Overwrite::set(Some("no patient data supplied".into())),
                ..Default::default()
            });
        }
        let data = match self
            .decoder
            .ask::<StructuredPatientData>(&anamnesis_prompt(&state.patient_data))
            .await
        {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(patient_id = %state.patient_id, error = %e, "anamnesis could not be structured");
                return Ok(TherapeuticPatch {
                    patient_data_structured: Overwrite::set(None),
                    error_anamnesis: Overwrite::set(Some(e.to_string())),
                    ..Default::default()
                });
            }
        };
        if let Err(e) = self.writer.upsert_patient(&state.patient_id, &data).await {
            tracing::warn!(patient_id = %state.patient_id, error = %e, "patient upsert failed");
        }
        Ok(TherapeuticPatch {
            patient_data_structured: Overwrite::set(Some(data)),
            error_anamnesis: Overwrite::set(None),
            ..Default::default()
        })
    }
}

/// Free-text diagnosis from the structured data and the stored patient context.
pub struct DiagnosisNode {
    llm: Arc<dyn LlmClient>,
    writer: KnowledgeGraphWriter,
}

impl DiagnosisNode {
    pub fn new(llm: Arc<dyn LlmClient>, writer: KnowledgeGraphWriter) -> Self {
        Self { llm, writer }
    }
}

#[async_trait]
impl Node<TherapeuticState> for DiagnosisNode {
    fn id(&self) -> &str {
        DIAGNOSIS
    }

    async fn run(&self, state: TherapeuticState) -> Result<TherapeuticPatch, AgentError> {
        let Some(data) = &state.patient_data_structured else {
            return Ok(TherapeuticPatch {
                diagnosis: Overwrite::set(None),
                error_diagnosis: Overwrite::set(Some("no structured patient data".into())),
                ..Default::default()
            });
        };
        let context = match self.writer.patient_context(&state.patient_id).await {
            Ok(Some(ctx)) => format!("\n\nKnowledge-graph record:\n{}", ctx),
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(patient_id = %state.patient_id, error = %e, "patient context unavailable");
                String::new()
            }
        };
        let prompt = format!(
            "Analyse the clinical data below. Identify the obesity stage, comorbidities and main \
             risk factors, and answer with a concise diagnosis.\n\n{}{}",
            describe_patient(data),
            context
        );
        match self.llm.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => Ok(TherapeuticPatch {
                diagnosis: Overwrite::set(Some(text.trim().to_string())),
                error_diagnosis: Overwrite::set(None),
                ..Default::default()
            }),
            Ok(_) => Ok(TherapeuticPatch {
                diagnosis: Overwrite::set(None),
                error_diagnosis: Overwrite::set(Some("empty diagnosis".into())),
                ..Default::default()
            }),
            Err(e) => {
                tracing::warn!(patient_id = %state.patient_id, error = %e, "diagnosis failed");
                Ok(TherapeuticPatch {
                    diagnosis: Overwrite::set(None),
                    error_diagnosis: Overwrite::set(Some(e.to_string())),
                    ..Default::default()
                })
            }
        }
    }
}

fn format_evidence(hits: &[VectorHit]) -> String {
    if hits.is_empty() {
        return "(no stored evidence)".into();
    }
    hits.iter()
        .map(|h| {
            let source = h
                .metadata
                .get("source_identifier")
                .and_then(|v| v.as_str())
                .unwrap_or(&h.document_id);
            format!("[{}] {}", source, h.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drafts a plan, citing knowledge-base passages; replays earlier corrections.
pub struct PlanningNode {
    llm: Arc<dyn LlmClient>,
    vectors: Arc<dyn VectorStore>,
    top_k: usize,
}

impl PlanningNode {
    pub fn new(llm: Arc<dyn LlmClient>, vectors: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self { llm, vectors, top_k }
    }
}

#[async_trait]
impl Node<TherapeuticState> for PlanningNode {
    fn id(&self) -> &str {
        PLANNING
    }

    async fn run(&self, state: TherapeuticState) -> Result<TherapeuticPatch, AgentError> {
        let (Some(data), Some(diagnosis)) = (&state.patient_data_structured, &state.diagnosis) else {
            return Ok(TherapeuticPatch {
                plan: Overwrite::set(None),
                error_planning: Overwrite::set(Some("diagnosis or patient data missing".into())),
                ..Default::default()
            });
        };
        let evidence = match self.vectors.search(diagnosis, self.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "evidence search failed, planning without citations");
                Vec::new()
            }
        };
        let mut prompt = format!(
            "Draft a multimodal treatment plan (nutrition, exercise, behaviour) for the patient below. \
             Cite the evidence supporting each key recommendation by its [source] tag.\n\n\
             {}\n\nDiagnosis:\n{}\n\nEvidence:\n{}",
            describe_patient(data),
            diagnosis,
            format_evidence(&evidence)
        );
        if !state.replan_instructions.is_empty() {
            prompt.push_str("\n\nA reviewer rejected earlier drafts. Address every point:\n");
            for instruction in &state.replan_instructions {
                prompt.push_str("- ");
                prompt.push_str(instruction);
                prompt.push('\n');
            }
        }
        match self.llm.generate(&prompt).await {
            Ok(plan) if !plan.trim().is_empty() => {
                tracing::debug!(attempt = state.replans_taken() + 1, "plan drafted");
                Ok(TherapeuticPatch {
                    plan: Overwrite::set(Some(plan.trim().to_string())),
                    error_planning: Overwrite::set(None),
                    ..Default::default()
                })
            }
            Ok(_) => Ok(TherapeuticPatch {
                plan: Overwrite::set(None),
                error_planning: Overwrite::set(Some("empty plan".into())),
                ..Default::default()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "planning failed");
                Ok(TherapeuticPatch {
                    plan: Overwrite::set(None),
                    error_planning: Overwrite::set(Some(e.to_string())),
                    ..Default::default()
                })
            }
        }
    }
}

/// Reviews the plan and decides whether another planning round is allowed.
///
/// Keeps the best-scoring plan seen so far. A rejection with budget left
/// appends one correction and sets `Replan`; without budget the best plan
/// replaces the current one and the outcome is `Exhausted`. A round that
/// produced no plan ends the same way once any plan has been scored.
pub struct VerificationNode {
    decoder: StructuredDecoder,
    max_replans: usize,
}

impl VerificationNode {
    pub fn new(decoder: StructuredDecoder, max_replans: usize) -> Self {
        Self {
            decoder,
            max_replans,
        }
    }

    async fn review(&self, state: &TherapeuticState, plan: &str) -> PlanVerification {
        let prompt = format!(
            "Review the proposed treatment plan. For each recommendation check that the cited \
             evidence actually supports it. Give an overall confidence score between 0 and 1, \
             point out any inconsistency in the notes and say whether it is safe to proceed.\n\nDiagnosis:\n{}\n\nPlan:\n{}",
            state.diagnosis.as_deref().unwrap_or("(none)"),
            plan
        );
        match self.decoder.ask::<PlanVerification>(&prompt).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(patient_id = %state.patient_id, error = %e, "verification unavailable, treating plan as unsafe");
                PlanVerification::sentinel(format!("verification unavailable: {}", e))
            }
        }
    }
}

#[async_trait]
impl Node<TherapeuticState> for VerificationNode {
    fn id(&self) -> &str {
        VERIFICATION
    }

    async fn run(&self, state: TherapeuticState) -> Result<TherapeuticPatch, AgentError> {
        let Some(plan) = state.plan.clone() else {
            if let Some(best) = state.best_plan {
                tracing::warn!(
                    best_score = best.verification.confidence_score,
                    "replanning produced no plan, keeping best plan"
                );
                return Ok(TherapeuticPatch {
                    plan: Overwrite::set(Some(best.plan.clone())),
                    verification: Overwrite::set(Some(best.verification.clone())),
                    best_plan: Overwrite::set(Some(best)),
                    plan_outcome: Overwrite::set(Some(PlanOutcome::Exhausted)),
                    ..Default::default()
                });
            }
            return Ok(TherapeuticPatch {
                verification: Overwrite::set(Some(PlanVerification::sentinel("plan missing"))),
                plan_outcome: Overwrite::set(Some(PlanOutcome::Unverified)),
                ..Default::default()
            });
        };
        let verification = self.review(&state, &plan).await;
        let candidate = ScoredPlan {
            plan,
            verification: verification.clone(),
        };
        let best = match state.best_plan {
            Some(best)
                if best.verification.confidence_score
                    >= candidate.verification.confidence_score =>
            {
                best
            }
            _ => candidate,
        };

        if verification.is_safe_to_proceed {
            tracing::info!(score = verification.confidence_score, "plan approved");
            return Ok(TherapeuticPatch {
                verification: Overwrite::set(Some(verification)),
                best_plan: Overwrite::set(Some(best)),
                plan_outcome: Overwrite::set(Some(PlanOutcome::Approved)),
                ..Default::default()
            });
        }
        if state.replan_instructions.len() < self.max_replans {
            tracing::info!(
                score = verification.confidence_score,
                replan = state.replan_instructions.len() + 1,
                max = self.max_replans,
                "plan rejected, replanning"
            );
            return Ok(TherapeuticPatch {
                replan_instructions: Append::one(format!("{}{}", CORRECTION_PREFIX, verification.notes)),
                verification: Overwrite::set(Some(verification)),
                best_plan: Overwrite::set(Some(best)),
                plan_outcome: Overwrite::set(Some(PlanOutcome::Replan)),
                ..Default::default()
            });
        }
        tracing::warn!(
            best_score = best.verification.confidence_score,
            "replanning budget exhausted, keeping best plan"
        );
        Ok(TherapeuticPatch {
            plan: Overwrite::set(Some(best.plan.clone())),
            verification: Overwrite::set(Some(best.verification.clone())),
            best_plan: Overwrite::set(Some(best)),
            plan_outcome: Overwrite::set(Some(PlanOutcome::Exhausted)),
            ..Default::default()
        })
    }
}
