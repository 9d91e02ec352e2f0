//! Core types for the biomarker analytics pipeline
//!
//! This module defines the data that flows through biomarker analysis: raw
//! samples as supplied by the store, per-channel statistics, and the report
//! shape consumed by the API layer. Treatment-side types live in
//! [`crate::treatment::types`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::TimeframeConfig;
use crate::error::AnalyticsError;

/// One timestamped observation produced by the feature extractor.
///
/// Samples are owned by the persistence store; the pipeline only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Session this sample belongs to
    pub session_id: String,
    /// Observation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Arousal level (conventionally normalized)
    pub arousal: f64,
    /// Valence level (conventionally normalized)
    pub valence: f64,
    /// Stress level (conventionally normalized)
    pub stress: f64,
    /// Emotion name -> intensity
    #[serde(default)]
    pub facial_emotions: BTreeMap<String, f64>,
    /// Action unit id -> intensity
    #[serde(default)]
    pub facial_action_units: BTreeMap<String, f64>,
    /// Prosody metric -> value
    #[serde(default)]
    pub vocal_prosody: BTreeMap<String, f64>,
    /// Voice quality metric -> value, absent when the extractor produced none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocal_quality: Option<BTreeMap<String, f64>>,
}

impl Sample {
    /// Create a sample with headline metrics only
    pub fn new(
        session_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        arousal: f64,
        valence: f64,
        stress: f64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp,
            arousal,
            valence,
            stress,
            facial_emotions: BTreeMap::new(),
            facial_action_units: BTreeMap::new(),
            vocal_prosody: BTreeMap::new(),
            vocal_quality: None,
        }
    }

    /// The emotion with the highest intensity, if any were reported.
    ///
    /// Ties resolve to the lexicographically first name.
    pub fn dominant_emotion(&self) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (name, value) in &self.facial_emotions {
            match best {
                Some((_, v)) if *value <= v => {}
                _ => best = Some((name.as_str(), *value)),
            }
        }
        best.map(|(name, _)| name)
    }
}

/// Half-open time range `[start, end)` used to select samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Create a window, rejecting empty or inverted ranges
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AnalyticsError> {
        if start >= end {
            return Err(AnalyticsError::Validation(format!(
                "window start {} must precede end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering the `timeframe` days that end at `end`
    pub fn trailing(timeframe: Timeframe, end: DateTime<Utc>) -> Self {
        Self {
            start: end - Duration::days(i64::from(timeframe.days())),
            end,
        }
    }

    /// Window covering the `timeframe` days that end now
    pub fn ending_now(timeframe: Timeframe) -> Self {
        Self::trailing(timeframe, Utc::now())
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// Look-back period in whole days, validated against [`TimeframeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe(u32);

impl Timeframe {
    /// Validate a requested timeframe; requests outside the configured bounds
    /// are rejected before any analysis runs.
    pub fn new(days: u32, bounds: &TimeframeConfig) -> Result<Self, AnalyticsError> {
        if days < bounds.min_days || days > bounds.max_days {
            return Err(AnalyticsError::Validation(format!(
                "timeframe must be between {} and {} days, got {}",
                bounds.min_days, bounds.max_days, days
            )));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

/// Direction of a smoothed series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    InsufficientData,
    Stable,
    Increasing,
    Decreasing,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::InsufficientData => "insufficient_data",
            TrendLabel::Stable => "stable",
            TrendLabel::Increasing => "increasing",
            TrendLabel::Decreasing => "decreasing",
        }
    }
}

/// Summary statistics for one named channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStat {
    pub mean: f64,
    /// Population standard deviation (divisor n)
    pub std: f64,
    pub trend: TrendLabel,
}

/// Headline arousal/valence/stress statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalMetrics {
    pub arousal: ChannelStat,
    pub valence: ChannelStat,
    pub stress: ChannelStat,
}

/// Facial channel aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacialAnalysis {
    /// Emotion -> mean intensity across reporting samples
    pub dominant_emotions: BTreeMap<String, f64>,
    /// Action unit -> mean intensity across reporting samples
    pub action_unit_frequencies: BTreeMap<String, f64>,
    /// `"from->to"` -> number of dominant-emotion changes between consecutive samples
    pub emotion_transitions: BTreeMap<String, u32>,
}

/// Share of samples that carried vocal sub-maps
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechPatterns {
    pub prosody_coverage: f64,
    pub quality_coverage: f64,
}

/// Vocal channel aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocalAnalysis {
    pub prosody_metrics: BTreeMap<String, ChannelStat>,
    pub quality_metrics: BTreeMap<String, ChannelStat>,
    pub speech_patterns: SpeechPatterns,
}

/// Output of signal aggregation over a non-empty sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub emotional_metrics: EmotionalMetrics,
    pub facial_analysis: FacialAnalysis,
    pub vocal_analysis: VocalAnalysis,
}

/// Inter-sample interval statistics (seconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFrequency {
    pub mean_interval: f64,
    pub std_interval: f64,
}

/// Temporal distribution of samples.
///
/// Buckets hold raw sample counts in UTC. Weekday 0 is Monday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalReport {
    pub session_frequency: SessionFrequency,
    pub time_of_day_distribution: [usize; 24],
    pub weekly_pattern: [usize; 7],
}

/// Report provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub record_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Combined biomarker report. Key names are part of the API contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerReport {
    pub emotional_metrics: EmotionalMetrics,
    pub facial_analysis: FacialAnalysis,
    pub vocal_analysis: VocalAnalysis,
    pub temporal_patterns: TemporalReport,
    pub metadata: ReportMetadata,
}

/// Marker for the `no_data` status value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataStatus {
    NoData,
}

/// Returned instead of statistics when a window holds no samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoDataCondition {
    pub status: NoDataStatus,
    pub message: String,
}

impl Default for NoDataCondition {
    fn default() -> Self {
        Self {
            status: NoDataStatus::NoData,
            message: "No recent biomarker data available".to_string(),
        }
    }
}

/// Result of an analysis that may legitimately find nothing to analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    NoData(NoDataCondition),
    Ready(T),
}

impl<T> Outcome<T> {
    pub fn no_data() -> Self {
        Outcome::NoData(NoDataCondition::default())
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Outcome::NoData(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::NoData(_) => None,
        }
    }
}

/// Raw headline series for a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub arousal: Vec<f64>,
    pub valence: Vec<f64>,
    pub stress: Vec<f64>,
}

/// Headline series with per-metric summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub session_id: String,
    pub metrics: MetricValues,
    pub timestamps: Vec<DateTime<Utc>>,
    /// Absent when the series is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<EmotionalMetrics>,
}
