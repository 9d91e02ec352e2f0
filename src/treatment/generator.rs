//! Recommendation generator interface
//!
//! The generator is an external service (retrieval-augmented LLM). It is
//! injected into the prioritizer as a trait object so the merge logic can be
//! exercised without network access.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AnalyticsError;
use crate::treatment::types::{CandidateRecommendation, StatusReport, TreatmentSnapshot};

/// Produces candidate recommendations for a treatment's current status
#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    /// Generate recommendations, each pre-tagged with a priority.
    ///
    /// Failures should be reported as [`AnalyticsError::Generator`].
    async fn generate(
        &self,
        treatment: &TreatmentSnapshot,
        status: &StatusReport,
    ) -> Result<Vec<CandidateRecommendation>, AnalyticsError>;
}

/// Invoke `generator`, treating expiry of `timeout` as a generator failure.
///
/// Dropping the returned future cancels the pending call.
pub async fn generate_with_timeout(
    generator: &dyn RecommendationGenerator,
    treatment: &TreatmentSnapshot,
    status: &StatusReport,
    timeout: Duration,
) -> Result<Vec<CandidateRecommendation>, AnalyticsError> {
    match tokio::time::timeout(timeout, generator.generate(treatment, status)).await {
        Ok(result) => result,
        Err(_) => Err(AnalyticsError::GeneratorTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Generator that always returns the same candidates.
///
/// Used by the CLI to replay recommendations captured from the live service.
#[derive(Debug, Clone, Default)]
pub struct StaticGenerator {
    candidates: Vec<CandidateRecommendation>,
}

impl StaticGenerator {
    pub fn new(candidates: Vec<CandidateRecommendation>) -> Self {
        Self { candidates }
    }

    /// Load candidates from a JSON array
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl RecommendationGenerator for StaticGenerator {
    async fn generate(
        &self,
        _treatment: &TreatmentSnapshot,
        _status: &StatusReport,
    ) -> Result<Vec<CandidateRecommendation>, AnalyticsError> {
        Ok(self.candidates.clone())
    }
}
