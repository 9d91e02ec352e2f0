//! Signal aggregation
//!
//! This module rolls a chronological set of samples up into per-channel
//! statistics:
//! - Facial emotions and action units: mean intensity per channel
//! - Vocal prosody and quality metrics: mean, std and trend per channel
//! - Headline arousal/valence/stress: mean, std and trend

use std::collections::BTreeMap;

use tracing::debug;

use crate::trend::{mean, TrendCalculator};
use crate::types::{
    ChannelStat, EmotionalMetrics, FacialAnalysis, Outcome, Sample, SignalSummary, SpeechPatterns,
    VocalAnalysis,
};

/// Per-channel statistical aggregator
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalAggregator {
    trend: TrendCalculator,
}

impl SignalAggregator {
    pub fn new(trend: TrendCalculator) -> Self {
        Self { trend }
    }

    /// Aggregate all channels of `records`.
    ///
    /// Records must be in chronological order; trends follow that order.
    /// An empty slice yields [`Outcome::NoData`].
    pub fn aggregate(&self, records: &[Sample]) -> Outcome<SignalSummary> {
        let emotional_metrics = match self.emotional_metrics(records) {
            Some(metrics) => metrics,
            None => return Outcome::no_data(),
        };

        let facial_analysis = aggregate_facial(records);
        let vocal_analysis = self.aggregate_vocal(records);

        debug!(
            records = records.len(),
            emotions = facial_analysis.dominant_emotions.len(),
            action_units = facial_analysis.action_unit_frequencies.len(),
            prosody = vocal_analysis.prosody_metrics.len(),
            quality = vocal_analysis.quality_metrics.len(),
            "aggregated biomarker channels"
        );

        Outcome::Ready(SignalSummary {
            emotional_metrics,
            facial_analysis,
            vocal_analysis,
        })
    }

    /// Headline statistics over every record, `None` when empty
    pub fn emotional_metrics(&self, records: &[Sample]) -> Option<EmotionalMetrics> {
        let arousal: Vec<f64> = records.iter().map(|r| r.arousal).collect();
        let valence: Vec<f64> = records.iter().map(|r| r.valence).collect();
        let stress: Vec<f64> = records.iter().map(|r| r.stress).collect();

        Some(EmotionalMetrics {
            arousal: self.trend.channel_stat(&arousal)?,
            valence: self.trend.channel_stat(&valence)?,
            stress: self.trend.channel_stat(&stress)?,
        })
    }

    fn aggregate_vocal(&self, records: &[Sample]) -> VocalAnalysis {
        let prosody = collect_channels(records.iter().map(|r| &r.vocal_prosody));
        let quality = collect_channels(records.iter().filter_map(|r| r.vocal_quality.as_ref()));

        VocalAnalysis {
            prosody_metrics: self.channel_stats(prosody),
            quality_metrics: self.channel_stats(quality),
            speech_patterns: compute_speech_patterns(records),
        }
    }

    fn channel_stats(&self, channels: BTreeMap<String, Vec<f64>>) -> BTreeMap<String, ChannelStat> {
        channels
            .into_iter()
            .filter_map(|(name, values)| self.trend.channel_stat(&values).map(|stat| (name, stat)))
            .collect()
    }
}

fn aggregate_facial(records: &[Sample]) -> FacialAnalysis {
    let emotions = collect_channels(records.iter().map(|r| &r.facial_emotions));
    let action_units = collect_channels(records.iter().map(|r| &r.facial_action_units));

    FacialAnalysis {
        dominant_emotions: channel_means(emotions),
        action_unit_frequencies: channel_means(action_units),
        emotion_transitions: count_emotion_transitions(records),
    }
}

/// Gather per-channel values in record order.
///
/// Records that lack a channel do not contribute to it.
fn collect_channels<'a>(
    maps: impl Iterator<Item = &'a BTreeMap<String, f64>>,
) -> BTreeMap<String, Vec<f64>> {
    let mut channels: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for map in maps {
        for (name, value) in map {
            channels.entry(name.clone()).or_default().push(*value);
        }
    }
    channels
}

fn channel_means(channels: BTreeMap<String, Vec<f64>>) -> BTreeMap<String, f64> {
    channels
        .into_iter()
        .filter_map(|(name, values)| mean(&values).map(|m| (name, m)))
        .collect()
}

/// Count changes of the dominant emotion between consecutive records.
///
/// Records without facial emotions are skipped rather than breaking the chain.
fn count_emotion_transitions(records: &[Sample]) -> BTreeMap<String, u32> {
    let mut transitions = BTreeMap::new();
    let mut previous: Option<&str> = None;

    for current in records.iter().filter_map(Sample::dominant_emotion) {
        if let Some(prev) = previous {
            if prev != current {
                *transitions.entry(format!("{prev}->{current}")).or_insert(0) += 1;
            }
        }
        previous = Some(current);
    }

    transitions
}

fn compute_speech_patterns(records: &[Sample]) -> SpeechPatterns {
    if records.is_empty() {
        return SpeechPatterns::default();
    }
    let total = records.len() as f64;
    let with_prosody = records.iter().filter(|r| !r.vocal_prosody.is_empty()).count();
    let with_quality = records
        .iter()
        .filter(|r| r.vocal_quality.as_ref().is_some_and(|q| !q.is_empty()))
        .count();

    SpeechPatterns {
        prosody_coverage: with_prosody as f64 / total,
        quality_coverage: with_quality as f64 / total,
    }
}
