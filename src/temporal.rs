//! Temporal pattern extraction
//!
//! Derives sampling cadence and time-of-day/day-of-week distributions from
//! sample timestamps alone. Buckets hold raw counts in UTC; weekday 0 is
//! Monday.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::trend::{mean, population_std};
use crate::types::{Sample, SessionFrequency, TemporalReport};

/// Analyzer for sample timing
pub struct TemporalPatternAnalyzer;

impl TemporalPatternAnalyzer {
    /// Analyze the timestamps of `records`
    pub fn analyze(records: &[Sample]) -> TemporalReport {
        let mut timestamps: Vec<DateTime<Utc>> = records.iter().map(|r| r.timestamp).collect();
        timestamps.sort();
        Self::analyze_timestamps(&timestamps)
    }

    /// Analyze an already sorted timestamp series
    pub fn analyze_timestamps(timestamps: &[DateTime<Utc>]) -> TemporalReport {
        TemporalReport {
            session_frequency: compute_session_frequency(timestamps),
            time_of_day_distribution: hour_of_day_counts(timestamps),
            weekly_pattern: weekday_counts(timestamps),
        }
    }
}

/// Mean and population std of consecutive intervals, in seconds.
///
/// Both are zero when fewer than two timestamps exist.
fn compute_session_frequency(timestamps: &[DateTime<Utc>]) -> SessionFrequency {
    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
        .collect();

    match mean(&intervals) {
        Some(mean_interval) => SessionFrequency {
            mean_interval,
            std_interval: population_std(&intervals, mean_interval),
        },
        None => SessionFrequency::default(),
    }
}

fn hour_of_day_counts(timestamps: &[DateTime<Utc>]) -> [usize; 24] {
    let mut counts = [0usize; 24];
    for ts in timestamps {
        counts[ts.hour() as usize] += 1;
    }
    counts
}

fn weekday_counts(timestamps: &[DateTime<Utc>]) -> [usize; 7] {
    let mut counts = [0usize; 7];
    for ts in timestamps {
        counts[ts.weekday().num_days_from_monday() as usize] += 1;
    }
    counts
}
