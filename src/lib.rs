//! Session Insight - Biomarker trends and treatment next steps for clinical sessions
//!
//! Two deterministic pipelines share one configuration:
//!
//! - **Biomarker pipeline**: session samples → signal aggregation + temporal
//!   patterns → biomarker report
//! - **Treatment pipeline**: treatment snapshot + interventions → status and
//!   RDoC alignment → generator recommendations → ordered next steps
//!
//! Storage and the recommendation generator are external collaborators
//! behind the [`SessionStore`] and [`RecommendationGenerator`] traits.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod temporal;
pub mod treatment;
pub mod trend;
pub mod types;
pub mod validation;

pub use aggregate::SignalAggregator;
pub use config::AnalyticsConfig;
pub use error::AnalyticsError;
pub use pipeline::InsightProcessor;
pub use report::ReportBuilder;
pub use store::{MemoryStore, SessionStore};
pub use temporal::TemporalPatternAnalyzer;
pub use treatment::{
    RecommendationGenerator, RecommendationPrioritizer, TreatmentStatusAnalyzer,
};
pub use trend::TrendCalculator;
pub use types::{BiomarkerReport, NoDataCondition, Outcome, Sample, Timeframe, TrendLabel, Window};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
