//! Pipeline orchestration
//!
//! This module provides the public API for session insight analytics.
//! It wires the store queries to the pure analysis stages.
//!
//! Biomarker pipeline stages:
//! 1. SessionStore - Fetch samples for the requested window
//! 2. Validation - Reject malformed samples
//! 3. SignalAggregator + TemporalPatternAnalyzer - Build the report
//!
//! Treatment pipeline stages:
//! 1. SessionStore - Fetch the treatment snapshot and its interventions
//! 2. TreatmentStatusAnalyzer - Roll up status and RDoC alignment
//! 3. RecommendationGenerator - Fetch candidate recommendations
//! 4. RecommendationPrioritizer - Merge and order next steps

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn, Instrument};

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::logging::analysis_span;
use crate::report::ReportBuilder;
use crate::store::SessionStore;
use crate::treatment::{
    NextStep, RecommendationGenerator, RecommendationPrioritizer, StatusReport, ThresholdAlignment,
    TreatmentStatusAnalyzer,
};
use crate::trend::TrendCalculator;
use crate::types::{BiomarkerReport, MetricSeries, Outcome, Sample, Timeframe, Window};
use crate::validation::validate_samples;

/// Entry point tying a configuration to the analysis stages.
///
/// Holds no per-request state, so one processor can serve concurrent
/// analyses.
#[derive(Clone)]
pub struct InsightProcessor {
    config: AnalyticsConfig,
    reports: ReportBuilder,
    status: TreatmentStatusAnalyzer,
    prioritizer: RecommendationPrioritizer,
}

impl Default for InsightProcessor {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}

impl InsightProcessor {
    pub fn new(config: AnalyticsConfig) -> Self {
        let status = TreatmentStatusAnalyzer::new(Arc::new(ThresholdAlignment::new(config.alignment)));
        Self {
            reports: ReportBuilder::new(TrendCalculator::new(config.trend)),
            prioritizer: RecommendationPrioritizer::from_config(&config),
            status,
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Validate a requested timeframe, falling back to the configured default
    pub fn timeframe(&self, days: Option<u32>) -> Result<Timeframe, AnalyticsError> {
        Timeframe::new(
            days.unwrap_or(self.config.timeframe.default_days),
            &self.config.timeframe,
        )
    }

    /// Biomarker report for `session_id` over the trailing `timeframe` ending now
    pub async fn biomarker_report(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        timeframe: Timeframe,
    ) -> Result<Outcome<BiomarkerReport>, AnalyticsError> {
        self.biomarker_report_at(store, session_id, timeframe, Utc::now())
            .await
    }

    /// Biomarker report over the trailing `timeframe` ending at `now`.
    ///
    /// A window with no samples yields [`Outcome::NoData`], not an error.
    pub async fn biomarker_report_at(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<Outcome<BiomarkerReport>, AnalyticsError> {
        let span = analysis_span("biomarkers", session_id);
        async {
            let window = Window::trailing(timeframe, now);
            let samples = store.fetch_samples(session_id, &window).await?;
            debug!(samples = samples.len(), days = timeframe.days(), "fetched samples");

            ensure_session(session_id, &samples)?;
            validate_samples(&samples)?;
            let report = self.reports.build(&samples);
            if report.is_no_data() {
                warn!("no biomarker data in window");
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Raw headline metric series for `session_id` inside `window`
    pub async fn metric_series(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        window: &Window,
    ) -> Result<MetricSeries, AnalyticsError> {
        let span = analysis_span("metrics", session_id);
        async {
            let samples = store.fetch_samples(session_id, window).await?;
            ensure_session(session_id, &samples)?;
            validate_samples(&samples)?;
            Ok(self.reports.metric_series(session_id, &samples))
        }
        .instrument(span)
        .await
    }

    /// Status report for a stored treatment as of `now`
    pub async fn treatment_status_at(
        &self,
        store: &dyn SessionStore,
        treatment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StatusReport, AnalyticsError> {
        let span = analysis_span("status", treatment_id);
        async {
            let treatment = store.fetch_treatment(treatment_id).await?;
            let interventions = store.fetch_interventions(treatment_id).await?;
            for intervention in &interventions {
                intervention.validate()?;
            }
            Ok(self.status.analyze_at(&treatment, &interventions, now))
        }
        .instrument(span)
        .await
    }

    /// Ordered next steps for a stored treatment
    pub async fn next_steps(
        &self,
        store: &dyn SessionStore,
        generator: &dyn RecommendationGenerator,
        treatment_id: &str,
    ) -> Result<Vec<NextStep>, AnalyticsError> {
        self.next_steps_at(store, generator, treatment_id, Utc::now())
            .await
    }

    /// Ordered next steps as of `now`.
    ///
    /// An unknown treatment surfaces as [`AnalyticsError::NotFound`]. Every
    /// later failure, including a failed intervention lookup, collapses to
    /// the single fallback step.
    pub async fn next_steps_at(
        &self,
        store: &dyn SessionStore,
        generator: &dyn RecommendationGenerator,
        treatment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<NextStep>, AnalyticsError> {
        let span = analysis_span("next_steps", treatment_id);
        async {
            let treatment = store.fetch_treatment(treatment_id).await?;
            let interventions = match store.fetch_interventions(treatment_id).await {
                Ok(interventions) => interventions,
                Err(e) => {
                    warn!(code = e.code(), error = %e, "intervention lookup failed");
                    return Ok(vec![NextStep::fallback()]);
                }
            };

            Ok(self
                .prioritizer
                .next_steps_at(&treatment, &interventions, generator, now)
                .await)
        }
        .instrument(span)
        .await
    }
}

/// A store returning another session's samples has broken its contract
fn ensure_session(session_id: &str, samples: &[Sample]) -> Result<(), AnalyticsError> {
    match samples.iter().find(|s| s.session_id != session_id) {
        Some(stray) => Err(AnalyticsError::Processing(format!(
            "store returned a sample of session {} for session {}",
            stray.session_id, session_id
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::treatment::{
        ActionKind, CandidateRecommendation, Intervention, NextStepKind, Priority, StaticGenerator,
        TreatmentSnapshot,
    };
    use crate::types::TrendLabel;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for i in 0..6 {
            let mut sample = Sample::new(
                "s1",
                now() - Duration::hours(6 - i),
                0.2 + 0.1 * i as f64,
                0.1,
                0.5,
            );
            sample
                .facial_emotions
                .insert("joy".to_string(), 0.4 + 0.05 * i as f64);
            store.insert_sample(sample);
        }
        // Outside any trailing week
        store.insert_sample(Sample::new("s1", now() - Duration::days(40), 0.9, 0.9, 0.9));

        store.insert_treatment(TreatmentSnapshot {
            id: "t1".to_string(),
            patient_id: None,
            created_at: now() - Duration::days(14),
            treatment_plan: serde_json::json!({"goal": "reduce anxiety"}),
            rdoc_targets: Default::default(),
            rdoc_outcomes: Default::default(),
        });
        store.insert_intervention(
            "t1",
            serde_json::from_str::<Intervention>(
                r#"{"id": "i1", "type": "cbt", "status": "in_progress", "progress": 20}"#,
            )
            .unwrap(),
        );
        store
    }

    #[tokio::test]
    async fn test_biomarker_report_end_to_end() {
        let processor = InsightProcessor::default();
        let timeframe = processor.timeframe(None).unwrap();

        let report = processor
            .biomarker_report_at(&store(), "s1", timeframe, now())
            .await
            .unwrap()
            .ready()
            .unwrap();

        assert_eq!(report.metadata.record_count, 6);
        assert_eq!(report.emotional_metrics.arousal.trend, TrendLabel::Increasing);
        assert!(report.facial_analysis.dominant_emotions.contains_key("joy"));
        assert_eq!(report.temporal_patterns.time_of_day_distribution.iter().sum::<usize>(), 6);
    }

    #[tokio::test]
    async fn test_biomarker_report_no_data() {
        let processor = InsightProcessor::default();
        let timeframe = processor.timeframe(Some(1)).unwrap();

        let outcome = processor
            .biomarker_report_at(&store(), "unknown", timeframe, now())
            .await
            .unwrap();
        assert!(outcome.is_no_data());
    }

    #[tokio::test]
    async fn test_biomarker_report_rejects_invalid_samples() {
        let mut store = store();
        store.insert_sample(Sample::new("s1", now() - Duration::minutes(5), f64::NAN, 0.0, 0.0));
        let processor = InsightProcessor::default();
        let timeframe = processor.timeframe(None).unwrap();

        let err = processor
            .biomarker_report_at(&store, "s1", timeframe, now())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation(_)));
    }

    #[test]
    fn test_timeframe_bounds() {
        let processor = InsightProcessor::default();
        assert_eq!(processor.timeframe(None).unwrap().days(), 7);
        assert!(processor.timeframe(Some(0)).is_err());
        assert!(processor.timeframe(Some(31)).is_err());
        assert_eq!(processor.timeframe(Some(30)).unwrap().days(), 30);
    }

    #[tokio::test]
    async fn test_metric_series() {
        let processor = InsightProcessor::default();
        let window = Window::new(now() - Duration::days(1), now()).unwrap();

        let series = processor.metric_series(&store(), "s1", &window).await.unwrap();

        assert_eq!(series.metrics.arousal.len(), 6);
        assert_eq!(series.timestamps.len(), 6);
        assert!(series.summary.is_some());
    }

    #[tokio::test]
    async fn test_treatment_status() {
        let processor = InsightProcessor::default();

        let status = processor.treatment_status_at(&store(), "t1", now()).await.unwrap();
        assert_eq!(status.overall_status.active_interventions, 1);
        assert_eq!(status.overall_status.duration, 14);

        let err = processor
            .treatment_status_at(&store(), "missing", now())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_next_steps_end_to_end() {
        let processor = InsightProcessor::default();
        let generator = StaticGenerator::new(vec![CandidateRecommendation {
            priority: Priority::Low,
            description: "Introduce mindfulness practice".to_string(),
            rationale: None,
            actions: Vec::new(),
        }]);

        let steps = processor
            .next_steps_at(&store(), &generator, "t1", now())
            .await
            .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, NextStepKind::InterventionAdjustment);
        assert_eq!(steps[0].suggested_actions[0].kind, ActionKind::Review);
        assert_eq!(steps[1].kind, NextStepKind::RagRecommendation);
    }

    #[tokio::test]
    async fn test_next_steps_unknown_treatment() {
        let processor = InsightProcessor::default();
        let err = processor
            .next_steps_at(&store(), &StaticGenerator::default(), "missing", now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    struct BrokenInterventions(MemoryStore);

    #[async_trait]
    impl SessionStore for BrokenInterventions {
        async fn fetch_samples(
            &self,
            session_id: &str,
            window: &Window,
        ) -> Result<Vec<Sample>, AnalyticsError> {
            self.0.fetch_samples(session_id, window).await
        }

        async fn fetch_interventions(
            &self,
            _treatment_id: &str,
        ) -> Result<Vec<Intervention>, AnalyticsError> {
            Err(AnalyticsError::Store("connection reset".to_string()))
        }

        async fn fetch_treatment(
            &self,
            treatment_id: &str,
        ) -> Result<TreatmentSnapshot, AnalyticsError> {
            self.0.fetch_treatment(treatment_id).await
        }
    }

    #[tokio::test]
    async fn test_next_steps_intervention_failure_falls_back() {
        let processor = InsightProcessor::default();
        let steps = processor
            .next_steps_at(
                &BrokenInterventions(store()),
                &StaticGenerator::default(),
                "t1",
                now(),
            )
            .await
            .unwrap();

        assert_eq!(steps, vec![NextStep::fallback()]);
    }

    struct LeakyStore(MemoryStore);

    #[async_trait]
    impl SessionStore for LeakyStore {
        async fn fetch_samples(
            &self,
            _session_id: &str,
            window: &Window,
        ) -> Result<Vec<Sample>, AnalyticsError> {
            self.0.fetch_samples("s1", window).await
        }

        async fn fetch_interventions(
            &self,
            treatment_id: &str,
        ) -> Result<Vec<Intervention>, AnalyticsError> {
            self.0.fetch_interventions(treatment_id).await
        }

        async fn fetch_treatment(
            &self,
            treatment_id: &str,
        ) -> Result<TreatmentSnapshot, AnalyticsError> {
            self.0.fetch_treatment(treatment_id).await
        }
    }

    #[tokio::test]
    async fn test_foreign_samples_are_processing_errors() {
        let processor = InsightProcessor::default();
        let timeframe = processor.timeframe(None).unwrap();

        let err = processor
            .biomarker_report_at(&LeakyStore(store()), "s2", timeframe, now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PROCESSING_ERROR");
    }
}
