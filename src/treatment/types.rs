//! Treatment-side types
//!
//! Interventions and treatment snapshots are read from the store; status
//! reports and next steps are computed here and never persisted by this
//! crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::AnalyticsError;

/// Lifecycle state of an intervention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    Planned,
    InProgress,
    Completed,
    Discontinued,
}

/// Timestamped clinician note on an intervention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressNote {
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

/// Unit of a planned intervention duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Sessions,
    Days,
    Weeks,
    Months,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Sessions => "sessions",
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
            DurationUnit::Months => "months",
        }
    }

    fn parse(unit: &str) -> Option<Self> {
        let unit = unit.to_ascii_lowercase();
        match unit.strip_suffix('s').unwrap_or(unit.as_str()) {
            "session" => Some(DurationUnit::Sessions),
            "day" => Some(DurationUnit::Days),
            "week" => Some(DurationUnit::Weeks),
            "month" => Some(DurationUnit::Months),
            _ => None,
        }
    }
}

/// Planned length of an intervention, e.g. `"8 sessions"` or `"6 weeks"`.
///
/// Progress is recorded as one note per contact, so the count is compared
/// directly against the number of progress notes. A bare number is read as
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlannedDuration {
    pub count: u32,
    pub unit: DurationUnit,
}

impl TryFrom<String> for PlannedDuration {
    type Error = AnalyticsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let invalid = || AnalyticsError::Validation(format!("invalid planned duration: {s:?}"));

        let mut parts = s.split_whitespace();
        let count = parts
            .next()
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let unit = match parts.next() {
            Some(unit) => DurationUnit::parse(unit).ok_or_else(invalid)?,
            None => DurationUnit::Sessions,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(PlannedDuration { count, unit })
    }
}

impl From<PlannedDuration> for String {
    fn from(d: PlannedDuration) -> Self {
        d.to_string()
    }
}

impl fmt::Display for PlannedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit.as_str())
    }
}

/// Planned treatment activity tracked over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub id: String,
    #[serde(rename = "type")]
    pub intervention_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: InterventionStatus,
    /// Completion percentage, 0..=100
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<PlannedDuration>,
    #[serde(default)]
    pub progress_notes: Vec<ProgressNote>,
}

impl Intervention {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.id.trim().is_empty() {
            return Err(AnalyticsError::Validation(
                "intervention id must not be empty".to_string(),
            ));
        }
        if self.progress > 100 {
            return Err(AnalyticsError::Validation(format!(
                "intervention {} progress {} exceeds 100",
                self.id, self.progress
            )));
        }
        Ok(())
    }

    /// Timestamp of the earliest progress note
    pub fn first_note_at(&self) -> Option<DateTime<Utc>> {
        self.progress_notes.iter().map(|n| n.timestamp).min()
    }
}

/// RDoC domain specification: construct name -> score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainSpec(pub BTreeMap<String, f64>);

impl DomainSpec {
    pub fn constructs(&self) -> &BTreeMap<String, f64> {
        &self.0
    }
}

impl FromIterator<(String, f64)> for DomainSpec {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        DomainSpec(iter.into_iter().collect())
    }
}

/// Treatment state needed for status analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentSnapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Opaque plan document, forwarded to recommendation generators
    #[serde(default)]
    pub treatment_plan: serde_json::Value,
    #[serde(default)]
    pub rdoc_targets: BTreeMap<String, DomainSpec>,
    #[serde(default)]
    pub rdoc_outcomes: BTreeMap<String, DomainSpec>,
}

/// Target/outcome agreement for one RDoC domain.
///
/// Variants are ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    Aligned,
    Partial,
    Divergent,
    Unknown,
}

/// Difference for one construct present in both target and outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstructGap {
    pub target: f64,
    pub observed: f64,
    /// `observed - target`
    pub difference: f64,
}

/// Structured diff between a domain's target and outcome specs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainGap {
    pub constructs: BTreeMap<String, ConstructGap>,
    /// Targeted constructs with no observed outcome
    pub missing_outcomes: Vec<String>,
    /// Observed constructs that were never targeted
    pub untargeted_outcomes: Vec<String>,
    /// Mean of `|difference|` over shared constructs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_absolute_gap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub status: AlignmentStatus,
    pub gap_analysis: DomainGap,
}

/// Roll-up across all interventions of a treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStatus {
    pub active_interventions: usize,
    pub completed_interventions: usize,
    /// Whole days since the treatment was created
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionDetail {
    #[serde(rename = "type")]
    pub intervention_type: String,
    pub status: InterventionStatus,
    pub progress: u8,
    /// Whole days since the first progress note, 0 without notes
    pub duration: i64,
}

/// Current treatment status, handed to recommendation generators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub overall_status: OverallStatus,
    /// Keyed by intervention id
    pub intervention_status: BTreeMap<String, InterventionDetail>,
    /// Only domains present in both targets and outcomes
    pub rdoc_alignment: BTreeMap<String, AlignmentResult>,
}

/// Next-step priority. Ordering is `High < Medium < Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// Origin of a next step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStepKind {
    InterventionAdjustment,
    RagRecommendation,
    Error,
}

/// Kind of a suggested action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Review,
    Adjust,
    DurationReview,
    /// Actions proposed by a recommendation generator
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl SuggestedAction {
    pub fn new(kind: ActionKind, description: impl Into<String>, priority: Priority) -> Self {
        Self {
            kind,
            description: description.into(),
            priority: Some(priority),
        }
    }
}

/// Recommendation returned by a [`crate::treatment::RecommendationGenerator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecommendation {
    pub priority: Priority,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub actions: Vec<SuggestedAction>,
}

impl CandidateRecommendation {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.description.trim().is_empty() {
            return Err(AnalyticsError::Validation(
                "generated recommendation has an empty description".to_string(),
            ));
        }
        Ok(())
    }
}

/// One entry of the ordered next-steps list.
///
/// The description is serialized as `recommendation` for API compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: NextStepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention_id: Option<String>,
    #[serde(rename = "recommendation", alias = "description")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
}

/// Description used for the single fallback step
pub const FALLBACK_DESCRIPTION: &str = "Error generating recommendations";

impl NextStep {
    /// The single step returned when recommendation generation fails
    pub fn fallback() -> Self {
        Self {
            priority: Priority::High,
            kind: NextStepKind::Error,
            intervention_id: None,
            description: FALLBACK_DESCRIPTION.to_string(),
            rationale: None,
            suggested_actions: Vec::new(),
        }
    }
}

impl From<CandidateRecommendation> for NextStep {
    fn from(rec: CandidateRecommendation) -> Self {
        Self {
            priority: rec.priority,
            kind: NextStepKind::RagRecommendation,
            intervention_id: None,
            description: rec.description,
            rationale: rec.rationale,
            suggested_actions: rec.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planned_duration_parsing() {
        let d = PlannedDuration::try_from("8 sessions".to_string()).unwrap();
        assert_eq!(d.count, 8);
        assert_eq!(d.unit, DurationUnit::Sessions);

        let d = PlannedDuration::try_from("6 Weeks".to_string()).unwrap();
        assert_eq!(d.unit, DurationUnit::Weeks);

        let d = PlannedDuration::try_from("1 day".to_string()).unwrap();
        assert_eq!(d.unit, DurationUnit::Days);

        let d = PlannedDuration::try_from("12".to_string()).unwrap();
        assert_eq!(d.count, 12);
        assert_eq!(d.unit, DurationUnit::Sessions);

        assert!(PlannedDuration::try_from("soon".to_string()).is_err());
        assert!(PlannedDuration::try_from("3 fortnights".to_string()).is_err());
        assert!(PlannedDuration::try_from("".to_string()).is_err());
        assert!(PlannedDuration::try_from("8 sessionsss".to_string()).is_err());
        assert!(PlannedDuration::try_from("3 dayss".to_string()).is_err());
    }

    #[test]
    fn test_intervention_json() {
        let json = r#"{
            "id": "int-1",
            "type": "cbt",
            "status": "in_progress",
            "progress": 40,
            "duration": "4 sessions",
            "progress_notes": [
                {"timestamp": "2024-01-20T10:00:00Z", "note": "second"},
                {"timestamp": "2024-01-10T10:00:00Z", "note": "first"}
            ]
        }"#;
        let intervention: Intervention = serde_json::from_str(json).unwrap();

        assert_eq!(intervention.status, InterventionStatus::InProgress);
        assert_eq!(intervention.duration.unwrap().count, 4);
        assert_eq!(
            intervention.first_note_at().unwrap().to_rfc3339(),
            "2024-01-10T10:00:00+00:00"
        );

        let back = serde_json::to_value(&intervention).unwrap();
        assert_eq!(back["duration"], "4 sessions");
        assert_eq!(back["type"], "cbt");
    }

    #[test]
    fn test_malformed_duration_rejected_by_serde() {
        let json = r#"{"id": "x", "type": "cbt", "status": "planned", "progress": 0, "duration": "soon"}"#;
        assert!(serde_json::from_str::<Intervention>(json).is_err());
    }

    #[test]
    fn test_intervention_progress_validation() {
        let json = r#"{"id": "x", "type": "cbt", "status": "planned", "progress": 120}"#;
        let intervention: Intervention = serde_json::from_str(json).unwrap();
        assert!(intervention.validate().is_err());
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::Low.rank(), 2);
    }

    #[test]
    fn test_action_kind_other() {
        let action: SuggestedAction =
            serde_json::from_str(r#"{"type": "schedule_followup", "description": "Book a call"}"#)
                .unwrap();
        assert_eq!(action.kind, ActionKind::Other("schedule_followup".to_string()));
        assert_eq!(action.priority, None);

        let action: SuggestedAction =
            serde_json::from_str(r#"{"type": "duration_review", "description": "x", "priority": "medium"}"#)
                .unwrap();
        assert_eq!(action.kind, ActionKind::DurationReview);
    }

    #[test]
    fn test_next_step_serialization() {
        let json = serde_json::to_value(NextStep::fallback()).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["type"], "error");
        assert_eq!(json["recommendation"], FALLBACK_DESCRIPTION);
    }
}
