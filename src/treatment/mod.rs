//! Treatment status and next-step recommendations
//!
//! Pipeline: TreatmentSnapshot + Interventions → StatusReport → Generator →
//! rule pass → merged, priority-ordered next steps

pub mod alignment;
pub mod generator;
pub mod prioritizer;
pub mod status;
pub mod types;

pub use alignment::{AlignmentPolicy, ThresholdAlignment};
pub use generator::{RecommendationGenerator, StaticGenerator};
pub use prioritizer::{merge_next_steps, RecommendationPrioritizer};
pub use status::TreatmentStatusAnalyzer;
pub use types::{
    ActionKind, AlignmentResult, AlignmentStatus, CandidateRecommendation, Intervention, InterventionStatus,
    NextStep, NextStepKind, Priority, StatusReport, SuggestedAction, TreatmentSnapshot,
};
