//! Sample validation
//!
//! Samples come from an external feature extractor. Before aggregation they
//! are checked for shape problems the type system cannot rule out: empty
//! session ids, non-finite values and out-of-order timestamps.

use serde::Serialize;

use crate::error::AnalyticsError;
use crate::types::Sample;

/// A single problem found in a sample sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleIssue {
    pub index: usize,
    pub message: String,
}

/// Check one sample in isolation
pub fn validate_sample(sample: &Sample) -> Result<(), AnalyticsError> {
    if sample.session_id.trim().is_empty() {
        return Err(AnalyticsError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }

    for (field, value) in [
        ("arousal", sample.arousal),
        ("valence", sample.valence),
        ("stress", sample.stress),
    ] {
        if !value.is_finite() {
            return Err(AnalyticsError::Validation(format!(
                "{field} must be finite, got {value}"
            )));
        }
    }

    let channel_maps = [
        ("facial_emotions", Some(&sample.facial_emotions)),
        ("facial_action_units", Some(&sample.facial_action_units)),
        ("vocal_prosody", Some(&sample.vocal_prosody)),
        ("vocal_quality", sample.vocal_quality.as_ref()),
    ];
    for (field, map) in channel_maps {
        let Some(map) = map else { continue };
        if let Some((name, value)) = map.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnalyticsError::Validation(format!(
                "{field}.{name} must be finite, got {value}"
            )));
        }
    }

    Ok(())
}

/// Collect every issue in a sample sequence, including ordering problems
pub fn collect_issues(samples: &[Sample]) -> Vec<SampleIssue> {
    let mut issues = Vec::new();

    for (index, sample) in samples.iter().enumerate() {
        if let Err(e) = validate_sample(sample) {
            issues.push(SampleIssue {
                index,
                message: e.to_string(),
            });
        }

        if index > 0 && sample.timestamp < samples[index - 1].timestamp {
            issues.push(SampleIssue {
                index,
                message: format!(
                    "timestamp {} precedes previous sample",
                    sample.timestamp.to_rfc3339()
                ),
            });
        }
    }

    issues
}

/// Validate a chronological sample sequence, failing on the first issue
pub fn validate_samples(samples: &[Sample]) -> Result<(), AnalyticsError> {
    match collect_issues(samples).into_iter().next() {
        Some(issue) => Err(AnalyticsError::Validation(format!(
            "sample {}: {}",
            issue.index, issue.message
        ))),
        None => Ok(()),
    }
}
