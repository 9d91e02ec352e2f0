//! Next-step prioritization
//!
//! Merges rule-based intervention adjustments with generator recommendations
//! into one ordered list. The sequence for a single treatment is strict:
//! status analysis, generator call, rule pass, merge, stable sort. Any
//! failure along the way collapses the result to a single fallback step.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::config::{AdjustmentConfig, AnalyticsConfig};
use crate::error::AnalyticsError;
use crate::treatment::alignment::ThresholdAlignment;
use crate::treatment::generator::{generate_with_timeout, RecommendationGenerator};
use crate::treatment::status::TreatmentStatusAnalyzer;
use crate::treatment::types::{
    ActionKind, CandidateRecommendation, Intervention, InterventionStatus, NextStep, NextStepKind,
    Priority, SuggestedAction, TreatmentSnapshot,
};

/// Builds the ordered next-steps list for a treatment
#[derive(Clone)]
pub struct RecommendationPrioritizer {
    analyzer: TreatmentStatusAnalyzer,
    adjustment: AdjustmentConfig,
    generator_timeout: Duration,
}

impl Default for RecommendationPrioritizer {
    fn default() -> Self {
        Self::from_config(&AnalyticsConfig::default())
    }
}

impl RecommendationPrioritizer {
    pub fn new(
        analyzer: TreatmentStatusAnalyzer,
        adjustment: AdjustmentConfig,
        generator_timeout: Duration,
    ) -> Self {
        Self {
            analyzer,
            adjustment,
            generator_timeout,
        }
    }

    /// Prioritizer using threshold alignment and the configured limits
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(
            TreatmentStatusAnalyzer::new(Arc::new(ThresholdAlignment::new(config.alignment))),
            config.adjustment,
            config.generator_timeout(),
        )
    }

    /// Ordered next steps as of now
    pub async fn next_steps(
        &self,
        treatment: &TreatmentSnapshot,
        interventions: &[Intervention],
        generator: &dyn RecommendationGenerator,
    ) -> Vec<NextStep> {
        self.next_steps_at(treatment, interventions, generator, Utc::now())
            .await
    }

    /// Ordered next steps as of `now`.
    ///
    /// Never fails: errors are logged and replaced by [`NextStep::fallback`].
    /// Dropping the future cancels the generator call; no partial list is
    /// produced.
    pub async fn next_steps_at(
        &self,
        treatment: &TreatmentSnapshot,
        interventions: &[Intervention],
        generator: &dyn RecommendationGenerator,
        now: DateTime<Utc>,
    ) -> Vec<NextStep> {
        match self
            .try_next_steps(treatment, interventions, generator, now)
            .await
        {
            Ok(steps) => {
                info!(
                    treatment_id = %treatment.id,
                    steps = steps.len(),
                    "generated next steps"
                );
                steps
            }
            Err(e) => {
                error!(
                    treatment_id = %treatment.id,
                    code = e.code(),
                    error = %e,
                    "error generating next steps"
                );
                vec![NextStep::fallback()]
            }
        }
    }

    async fn try_next_steps(
        &self,
        treatment: &TreatmentSnapshot,
        interventions: &[Intervention],
        generator: &dyn RecommendationGenerator,
        now: DateTime<Utc>,
    ) -> Result<Vec<NextStep>, AnalyticsError> {
        for intervention in interventions {
            intervention.validate()?;
        }

        let status = self.analyzer.analyze_at(treatment, interventions, now);

        let candidates =
            generate_with_timeout(generator, treatment, &status, self.generator_timeout).await?;
        for candidate in &candidates {
            candidate.validate()?;
        }

        let rule_steps = self.rule_steps(interventions);
        Ok(merge_next_steps(rule_steps, candidates))
    }

    /// One high-priority adjustment per in-progress intervention lagging behind
    pub fn rule_steps(&self, interventions: &[Intervention]) -> Vec<NextStep> {
        interventions
            .iter()
            .filter(|i| {
                i.status == InterventionStatus::InProgress
                    && i.progress < self.adjustment.attention_below
            })
            .map(|i| NextStep {
                priority: Priority::High,
                kind: NextStepKind::InterventionAdjustment,
                intervention_id: Some(i.id.clone()),
                description: format!(
                    "Review and adjust {} intervention - Current progress: {}%",
                    i.intervention_type, i.progress
                ),
                rationale: None,
                suggested_actions: self.suggested_actions(i),
            })
            .collect()
    }

    /// Actions for a lagging intervention, by progress band and duration overrun
    pub fn suggested_actions(&self, intervention: &Intervention) -> Vec<SuggestedAction> {
        let mut actions = Vec::new();

        if intervention.progress < self.adjustment.review_below {
            actions.push(SuggestedAction::new(
                ActionKind::Review,
                "Comprehensive intervention review needed",
                Priority::High,
            ));
        } else if intervention.progress < self.adjustment.attention_below {
            actions.push(SuggestedAction::new(
                ActionKind::Adjust,
                "Consider adjusting intervention parameters",
                Priority::Medium,
            ));
        }

        if let Some(planned) = intervention.duration {
            if intervention.progress_notes.len() > planned.count as usize {
                actions.push(SuggestedAction::new(
                    ActionKind::DurationReview,
                    "Intervention exceeding planned duration",
                    Priority::Medium,
                ));
            }
        }

        actions
    }
}

/// Append generated recommendations after rule steps and stable-sort by
/// priority, so rule steps win ties.
pub fn merge_next_steps(
    rule_steps: Vec<NextStep>,
    candidates: Vec<CandidateRecommendation>,
) -> Vec<NextStep> {
    let mut steps = rule_steps;
    steps.extend(candidates.into_iter().map(NextStep::from));
    steps.sort_by_key(|step| step.priority);
    steps
}
