//! RDoC target/outcome alignment
//!
//! Each domain shared by a treatment's targets and outcomes gets a structured
//! gap analysis and a status from an [`AlignmentPolicy`]. Domains present on
//! only one side are left out of the result.

use std::collections::BTreeMap;

use crate::config::AlignmentConfig;
use crate::trend::mean;
use crate::treatment::types::{AlignmentResult, AlignmentStatus, ConstructGap, DomainGap, DomainSpec};

/// Strategy deciding how well an outcome meets its target.
///
/// Implementations must be monotonic: a gap that is no larger than another
/// must never yield a worse status.
pub trait AlignmentPolicy: Send + Sync {
    fn status(&self, gap: &DomainGap) -> AlignmentStatus;
}

/// Classifies by mean absolute construct gap against fixed limits
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdAlignment {
    config: AlignmentConfig,
}

impl ThresholdAlignment {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }
}

impl AlignmentPolicy for ThresholdAlignment {
    fn status(&self, gap: &DomainGap) -> AlignmentStatus {
        match gap.mean_absolute_gap {
            None => AlignmentStatus::Unknown,
            Some(g) if g <= self.config.aligned_within => AlignmentStatus::Aligned,
            Some(g) if g <= self.config.partial_within => AlignmentStatus::Partial,
            Some(_) => AlignmentStatus::Divergent,
        }
    }
}

/// Compute the structured diff between a target and an observed outcome
pub fn compute_gap(target: &DomainSpec, outcome: &DomainSpec) -> DomainGap {
    let mut constructs = BTreeMap::new();
    let mut missing_outcomes = Vec::new();

    for (name, &target_value) in target.constructs() {
        match outcome.constructs().get(name) {
            Some(&observed) => {
                constructs.insert(
                    name.clone(),
                    ConstructGap {
                        target: target_value,
                        observed,
                        difference: observed - target_value,
                    },
                );
            }
            None => missing_outcomes.push(name.clone()),
        }
    }

    let untargeted_outcomes = outcome
        .constructs()
        .keys()
        .filter(|name| !target.constructs().contains_key(*name))
        .cloned()
        .collect();

    let gaps: Vec<f64> = constructs.values().map(|g| g.difference.abs()).collect();
    let mean_absolute_gap = mean(&gaps);

    DomainGap {
        constructs,
        missing_outcomes,
        untargeted_outcomes,
        mean_absolute_gap,
    }
}

/// Alignment for every domain present in both maps
pub fn analyze_alignment(
    targets: &BTreeMap<String, DomainSpec>,
    outcomes: &BTreeMap<String, DomainSpec>,
    policy: &dyn AlignmentPolicy,
) -> BTreeMap<String, AlignmentResult> {
    targets
        .iter()
        .filter_map(|(domain, target)| {
            let outcome = outcomes.get(domain)?;
            let gap_analysis = compute_gap(target, outcome);
            let status = policy.status(&gap_analysis);
            Some((
                domain.clone(),
                AlignmentResult {
                    status,
                    gap_analysis,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(pairs: &[(&str, f64)]) -> DomainSpec {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_gap_analysis() {
        let target = spec(&[("reward_learning", 0.8), ("effort_valuation", 0.6)]);
        let outcome = spec(&[("reward_learning", 0.5), ("reward_anticipation", 0.4)]);
        let gap = compute_gap(&target, &outcome);

        let rl = gap.constructs["reward_learning"];
        assert!((rl.difference + 0.3).abs() < 1e-9);
        assert_eq!(gap.missing_outcomes, vec!["effort_valuation".to_string()]);
        assert_eq!(gap.untargeted_outcomes, vec!["reward_anticipation".to_string()]);
        assert!((gap.mean_absolute_gap.unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_statuses() {
        let policy = ThresholdAlignment::default();
        let target = spec(&[("fear", 0.5)]);

        let status = |observed: f64| policy.status(&compute_gap(&target, &spec(&[("fear", observed)])));
        assert_eq!(status(0.55), AlignmentStatus::Aligned);
        assert_eq!(status(0.30), AlignmentStatus::Partial);
        assert_eq!(status(0.0), AlignmentStatus::Divergent);

        let disjoint = compute_gap(&target, &spec(&[("anxiety", 0.5)]));
        assert_eq!(policy.status(&disjoint), AlignmentStatus::Unknown);
    }

    #[test]
    fn test_policy_is_monotonic() {
        let policy = ThresholdAlignment::default();
        let target = spec(&[("arousal", 0.0)]);

        let mut previous = AlignmentStatus::Aligned;
        for step in 0..=40 {
            let observed = step as f64 * 0.025;
            let status = policy.status(&compute_gap(&target, &spec(&[("arousal", observed)])));
            assert!(status >= previous, "status improved as the gap widened");
            previous = status;
        }
        assert_eq!(previous, AlignmentStatus::Divergent);
    }

    #[test]
    fn test_only_shared_domains() {
        let mut targets = BTreeMap::new();
        targets.insert("negative_valence".to_string(), spec(&[("fear", 0.2)]));
        targets.insert("positive_valence".to_string(), spec(&[("reward", 0.7)]));
        let mut outcomes = BTreeMap::new();
        outcomes.insert("negative_valence".to_string(), spec(&[("fear", 0.25)]));
        outcomes.insert("arousal".to_string(), spec(&[("sleep", 0.5)]));

        let alignment = analyze_alignment(&targets, &outcomes, &ThresholdAlignment::default());

        assert_eq!(alignment.len(), 1);
        assert_eq!(alignment["negative_valence"].status, AlignmentStatus::Aligned);
    }
}
