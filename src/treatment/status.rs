//! Treatment status analysis

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::treatment::alignment::{analyze_alignment, AlignmentPolicy, ThresholdAlignment};
use crate::treatment::types::{
    Intervention, InterventionDetail, InterventionStatus, OverallStatus, StatusReport,
    TreatmentSnapshot,
};

/// Rolls up intervention state and RDoC alignment for a treatment
#[derive(Clone)]
pub struct TreatmentStatusAnalyzer {
    policy: Arc<dyn AlignmentPolicy>,
}

impl Default for TreatmentStatusAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(ThresholdAlignment::default()))
    }
}

impl TreatmentStatusAnalyzer {
    pub fn new(policy: Arc<dyn AlignmentPolicy>) -> Self {
        Self { policy }
    }

    /// Analyze status as of now
    pub fn analyze(
        &self,
        treatment: &TreatmentSnapshot,
        interventions: &[Intervention],
    ) -> StatusReport {
        self.analyze_at(treatment, interventions, Utc::now())
    }

    /// Analyze status as of `now`.
    ///
    /// An empty intervention list is valid and yields zero counts.
    pub fn analyze_at(
        &self,
        treatment: &TreatmentSnapshot,
        interventions: &[Intervention],
        now: DateTime<Utc>,
    ) -> StatusReport {
        let count = |status: InterventionStatus| {
            interventions.iter().filter(|i| i.status == status).count()
        };

        let overall_status = OverallStatus {
            active_interventions: count(InterventionStatus::InProgress),
            completed_interventions: count(InterventionStatus::Completed),
            duration: whole_days(treatment.created_at, now),
        };

        let intervention_status: BTreeMap<String, InterventionDetail> = interventions
            .iter()
            .map(|i| {
                let detail = InterventionDetail {
                    intervention_type: i.intervention_type.clone(),
                    status: i.status,
                    progress: i.progress,
                    duration: i.first_note_at().map_or(0, |first| whole_days(first, now)),
                };
                (i.id.clone(), detail)
            })
            .collect();

        let rdoc_alignment = analyze_alignment(
            &treatment.rdoc_targets,
            &treatment.rdoc_outcomes,
            self.policy.as_ref(),
        );

        debug!(
            treatment_id = %treatment.id,
            interventions = interventions.len(),
            aligned_domains = rdoc_alignment.len(),
            "analyzed treatment status"
        );

        StatusReport {
            overall_status,
            intervention_status,
            rdoc_alignment,
        }
    }
}

/// Whole days elapsed from `from` to `now`; zero if `from` is in the future
fn whole_days(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - from).num_days().max(0)
}
