//! Biomarker report assembly
//!
//! Combines signal aggregation and temporal analysis into the report shape
//! consumed by the API layer, and builds the raw headline metric series.

use tracing::info;

use crate::aggregate::SignalAggregator;
use crate::temporal::TemporalPatternAnalyzer;
use crate::trend::TrendCalculator;
use crate::types::{BiomarkerReport, MetricSeries, MetricValues, Outcome, ReportMetadata, Sample};

/// Builder for biomarker reports
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder {
    aggregator: SignalAggregator,
}

impl ReportBuilder {
    pub fn new(trend: TrendCalculator) -> Self {
        Self {
            aggregator: SignalAggregator::new(trend),
        }
    }

    /// Build the combined report for chronological `records`
    pub fn build(&self, records: &[Sample]) -> Outcome<BiomarkerReport> {
        let (first, last) = match (records.first(), records.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Outcome::no_data(),
        };

        let summary = match self.aggregator.aggregate(records) {
            Outcome::Ready(summary) => summary,
            Outcome::NoData(condition) => return Outcome::NoData(condition),
        };
        let temporal_patterns = TemporalPatternAnalyzer::analyze(records);

        info!(
            record_count = records.len(),
            start_time = %first.timestamp.to_rfc3339(),
            end_time = %last.timestamp.to_rfc3339(),
            "built biomarker report"
        );

        Outcome::Ready(BiomarkerReport {
            emotional_metrics: summary.emotional_metrics,
            facial_analysis: summary.facial_analysis,
            vocal_analysis: summary.vocal_analysis,
            temporal_patterns,
            metadata: ReportMetadata {
                record_count: records.len(),
                start_time: first.timestamp,
                end_time: last.timestamp,
            },
        })
    }

    /// Raw arousal/valence/stress series with summaries
    pub fn metric_series(&self, session_id: &str, records: &[Sample]) -> MetricSeries {
        let metrics = MetricValues {
            arousal: records.iter().map(|r| r.arousal).collect(),
            valence: records.iter().map(|r| r.valence).collect(),
            stress: records.iter().map(|r| r.stress).collect(),
        };

        MetricSeries {
            session_id: session_id.to_string(),
            metrics,
            timestamps: records.iter().map(|r| r.timestamp).collect(),
            summary: self.aggregator.emotional_metrics(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_records(count: usize) -> Vec<Sample> {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let mut sample = Sample::new(
                    "session-7",
                    base + Duration::hours(i as i64),
                    0.3,
                    0.2 * i as f64,
                    0.5,
                );
                sample.facial_emotions.insert("neutral".to_string(), 0.5);
                sample.vocal_prosody.insert("rate".to_string(), 3.0);
                sample
            })
            .collect()
    }

    #[test]
    fn test_report_json_shape() {
        let report = ReportBuilder::default().build(&make_records(4));
        let json = serde_json::to_value(&report).unwrap();

        for key in [
            "emotional_metrics",
            "facial_analysis",
            "vocal_analysis",
            "temporal_patterns",
            "metadata",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["metadata"]["record_count"], 4);
        assert_eq!(json["metadata"]["start_time"], "2024-01-15T09:00:00Z");
        assert_eq!(json["metadata"]["end_time"], "2024-01-15T12:00:00Z");
        assert_eq!(json["emotional_metrics"]["valence"]["trend"], "increasing");
        assert!(json["facial_analysis"]["dominant_emotions"]["neutral"].is_number());
        assert!(json["vocal_analysis"]["prosody_metrics"]["rate"]["mean"].is_number());
        assert_eq!(
            json["temporal_patterns"]["session_frequency"]["mean_interval"],
            3600.0
        );
    }

    #[test]
    fn test_empty_report_is_no_data() {
        let report = ReportBuilder::default().build(&[]);
        assert!(report.is_no_data());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "no_data");
    }

    #[test]
    fn test_metric_series() {
        let records = make_records(3);
        let series = ReportBuilder::default().metric_series("session-7", &records);

        assert_eq!(series.metrics.arousal, vec![0.3, 0.3, 0.3]);
        assert_eq!(series.timestamps.len(), 3);
        assert!(series.summary.is_some());

        let empty = ReportBuilder::default().metric_series("session-7", &[]);
        assert!(empty.summary.is_none());
        assert!(empty.timestamps.is_empty());
    }
}
