//! Analytics configuration
//!
//! Every threshold the pipeline applies lives here so that deployments can
//! tune them without code changes. Defaults reproduce the behavior clinicians
//! have been reviewing against.

use serde::{Deserialize, Serialize};

/// Default moving-average window for trend classification
pub const DEFAULT_TREND_WINDOW: usize = 3;

/// Default absolute delta below which a smoothed series is `stable`
pub const DEFAULT_STABILITY_THRESHOLD: f64 = 0.1;

/// Default bound on a single recommendation generator call
pub const DEFAULT_GENERATOR_TIMEOUT_MS: u64 = 30_000;

/// Trend classification parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub window: usize,
    pub stability_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_TREND_WINDOW,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
        }
    }
}

/// Accepted look-back range for biomarker requests, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeConfig {
    pub min_days: u32,
    pub max_days: u32,
    pub default_days: u32,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self {
            min_days: 1,
            max_days: 30,
            default_days: 7,
        }
    }
}

/// Progress thresholds for rule-based intervention adjustments (percent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    /// In-progress interventions below this get an adjustment step
    pub attention_below: u8,
    /// Below this the suggested action is a full review instead of an adjustment
    pub review_below: u8,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            attention_below: 50,
            review_below: 25,
        }
    }
}

/// Mean absolute construct gap limits for RDoC alignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub aligned_within: f64,
    pub partial_within: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            aligned_within: 0.1,
            partial_within: 0.25,
        }
    }
}

/// Top-level configuration passed explicitly into every analysis entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub trend: TrendConfig,
    pub timeframe: TimeframeConfig,
    pub adjustment: AdjustmentConfig,
    pub alignment: AlignmentConfig,
    pub generator_timeout_ms: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend: TrendConfig::default(),
            timeframe: TimeframeConfig::default(),
            adjustment: AdjustmentConfig::default(),
            alignment: AlignmentConfig::default(),
            generator_timeout_ms: DEFAULT_GENERATOR_TIMEOUT_MS,
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn generator_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.generator_timeout_ms)
    }
}
