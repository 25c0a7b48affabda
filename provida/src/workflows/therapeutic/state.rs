//! Therapeutic workflow state, its patch and the records the nodes decode.

use serde::{Deserialize, Serialize};

use crate::channels::{Append, GraphState, Overwrite};
use crate::decode::StructuredOutput;

/// Patient data pulled out of the free-text intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredPatientData {
    pub name: String,
    pub age: u32,
    /// Body-mass index, kg/m².
    pub bmi: f64,
    /// Glycated haemoglobin, %.
    pub hba1c: f64,
    #[serde(default)]
    pub notes: String,
}

impl StructuredOutput for StructuredPatientData {
    fn schema_hint() -> String {
        r#"a JSON object {"name": string, "age": integer, "bmi": number, "hba1c": number, "notes": string}"#
            .into()
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".into());
        }
        if self.age > 130 {
            return Err(format!("implausible age {}", self.age));
        }
        if !(self.bmi > 0.0 && self.bmi < 150.0) {
            return Err(format!("implausible bmi {}", self.bmi));
        }
        if !(0.0..=25.0).contains(&self.hba1c) {
            return Err(format!("implausible hba1c {}", self.hba1c));
        }
        Ok(())
    }
}

/// Safety review of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanVerification {
    /// In `[0, 1]`.
    pub confidence_score: f64,
    pub notes: String,
    pub is_safe_to_proceed: bool,
}

impl PlanVerification {
    /// Unsafe verdict with zero confidence, used whenever no real review exists.
    pub fn sentinel(reason: impl Into<String>) -> Self {
        Self {
            confidence_score: 0.0,
            notes: reason.into(),
            is_safe_to_proceed: false,
        }
    }
}

impl StructuredOutput for PlanVerification {
    fn schema_hint() -> String {
        r#"a JSON object {"confidence_score": number between 0 and 1, "notes": string, "is_safe_to_proceed": boolean}"#
            .into()
    }

    fn validate(&self) -> Result<(), String> {
        if (0.0..=1.0).contains(&self.confidence_score) {
            Ok(())
        } else {
            Err(format!("confidence_score {} outside [0, 1]", self.confidence_score))
        }
    }
}

/// A plan together with the review it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPlan {
    pub plan: String,
    pub verification: PlanVerification,
}

/// Where the verification loop stands after the last review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanOutcome {
    /// The reviewer accepted the plan.
    Approved,
    /// Rejected with budget left; planning runs again.
    Replan,
    /// Rejected and out of replans; the best-scoring plan was kept.
    Exhausted,
    /// No plan could be drafted, so nothing was reviewed.
    Unverified,
}

/// State of one therapeutic run; the run id is the patient id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TherapeuticState {
    pub patient_id: String,
    pub patient_data: String,
    pub patient_data_structured: Option<StructuredPatientData>,
    pub diagnosis: Option<String>,
    pub plan: Option<String>,
    pub verification: Option<PlanVerification>,
    /// One correction per replanning loop, oldest first.
    pub replan_instructions: Vec<String>,
    pub best_plan: Option<ScoredPlan>,
    pub plan_outcome: Option<PlanOutcome>,
    pub error_anamnesis: Option<String>,
    pub error_diagnosis: Option<String>,
    pub error_planning: Option<String>,
}

impl TherapeuticState {
    pub fn new(patient_id: impl Into<String>, patient_data: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            patient_data: patient_data.into(),
            ..Self::default()
        }
    }

    pub fn replans_taken(&self) -> usize {
        self.replan_instructions.len()
    }
}

#[derive(Debug, Default)]
pub struct TherapeuticPatch {
    pub patient_data_structured: Overwrite<Option<StructuredPatientData>>,
    pub diagnosis: Overwrite<Option<String>>,
    pub plan: Overwrite<Option<String>>,
    pub verification: Overwrite<Option<PlanVerification>>,
    pub replan_instructions: Append<String>,
    pub best_plan: Overwrite<Option<ScoredPlan>>,
    pub plan_outcome: Overwrite<Option<PlanOutcome>>,
    pub error_anamnesis: Overwrite<Option<String>>,
    pub error_diagnosis: Overwrite<Option<String>>,
    pub error_planning: Overwrite<Option<String>>,
}

impl GraphState for TherapeuticState {
    type Patch = TherapeuticPatch;

    fn merge(&mut self, patch: TherapeuticPatch) {
        patch
            .patient_data_structured
            .merge_into(&mut self.patient_data_structured);
        patch.diagnosis.merge_into(&mut self.diagnosis);
        patch.plan.merge_into(&mut self.plan);
        patch.verification.merge_into(&mut self.verification);
        patch.replan_instructions.merge_into(&mut self.replan_instructions);
        patch.best_plan.merge_into(&mut self.best_plan);
        patch.plan_outcome.merge_into(&mut self.plan_outcome);
        patch.error_anamnesis.merge_into(&mut self.error_anamnesis);
        patch.error_diagnosis.merge_into(&mut self.error_diagnosis);
        patch.error_planning.merge_into(&mut self.error_planning);
    }
}
