//! Trend classification and shared channel statistics
//!
//! All consumers compute mean and standard deviation through this module so
//! that reports stay reproducible: population formulas (divisor n), values
//! summed in the order supplied.

use crate::config::TrendConfig;
use crate::types::{ChannelStat, TrendLabel};

/// Moving-average trend classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendCalculator {
    config: TrendConfig,
}

impl TrendCalculator {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Classify the direction of `values` using the configured window
    pub fn trend(&self, values: &[f64]) -> TrendLabel {
        self.trend_with_window(values, self.config.window)
    }

    /// Classify the direction of `values`.
    ///
    /// The series is smoothed with a simple moving average of `window` points;
    /// the label follows the difference between the last and first smoothed
    /// points. Series shorter than the window are `insufficient_data`.
    pub fn trend_with_window(&self, values: &[f64], window: usize) -> TrendLabel {
        let window = window.max(1);
        if values.len() < window {
            return TrendLabel::InsufficientData;
        }

        let smoothed = moving_average(values, window);
        let (first, last) = match (smoothed.first(), smoothed.last()) {
            (Some(first), Some(last)) if smoothed.len() >= 2 => (*first, *last),
            _ => return TrendLabel::Stable,
        };

        let delta = last - first;
        if delta.abs() < self.config.stability_threshold {
            TrendLabel::Stable
        } else if delta > 0.0 {
            TrendLabel::Increasing
        } else {
            TrendLabel::Decreasing
        }
    }

    /// Mean, population std and trend of a chronological series.
    ///
    /// Returns `None` for an empty series.
    pub fn channel_stat(&self, values: &[f64]) -> Option<ChannelStat> {
        let mean = mean(values)?;
        Some(ChannelStat {
            mean,
            std: population_std(values, mean),
            trend: self.trend(values),
        })
    }
}

/// Simple moving average producing `values.len() - window + 1` points
fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    values.windows(window).filter_map(mean).collect()
}

/// Arithmetic mean, `None` when empty.
///
/// Accumulated as a running mean so finite input never overflows, and
/// clamped so the result always lies within `[min, max]` of the input.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (first, rest) = values.split_first()?;

    let mut running = *first;
    let mut min = *first;
    let mut max = *first;
    for (i, &x) in rest.iter().enumerate() {
        let k = (i + 2) as f64;
        running += x / k - running / k;
        min = min.min(x);
        max = max.max(x);
    }

    Some(running.max(min).min(max))
}

/// Population standard deviation around a precomputed mean.
///
/// Deviations are halved and rescaled by their largest magnitude before
/// squaring, so finite input yields a finite result.
pub fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let halves: Vec<f64> = values.iter().map(|x| x / 2.0 - mean / 2.0).collect();
    let scale = halves.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
    if scale == 0.0 {
        return 0.0;
    }

    let variance =
        halves.iter().map(|d| (d / scale).powi(2)).sum::<f64>() / values.len() as f64;
    2.0 * scale * variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> TrendCalculator {
        TrendCalculator::default()
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(calc().trend(&[]), TrendLabel::InsufficientData);
        assert_eq!(calc().trend(&[1.0, 2.0]), TrendLabel::InsufficientData);
    }

    #[test]
    fn test_flat_series_is_stable() {
        assert_eq!(calc().trend(&[1.0; 6]), TrendLabel::Stable);
    }

    #[test]
    fn test_monotonic_series() {
        assert_eq!(
            calc().trend(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            TrendLabel::Increasing
        );
        assert_eq!(
            calc().trend(&[6.0, 5.0, 4.0, 3.0, 2.0, 1.0]),
            TrendLabel::Decreasing
        );
    }

    #[test]
    fn test_single_smoothed_point_is_stable() {
        // Exactly `window` values produce one smoothed point
        assert_eq!(calc().trend(&[1.0, 5.0, 9.0]), TrendLabel::Stable);
    }

    #[test]
    fn test_small_drift_below_threshold() {
        // Smoothed: 1.0, 1.0167, 1.0333 -> delta 0.033
        let values = [1.0, 1.0, 1.0, 1.05, 1.05];
        assert_eq!(calc().trend(&values), TrendLabel::Stable);
    }

    #[test]
    fn test_configurable_threshold_and_window() {
        let strict = TrendCalculator::new(TrendConfig {
            window: 2,
            stability_threshold: 0.01,
        });
        let values = [1.0, 1.0, 1.0, 1.05, 1.05];
        assert_eq!(strict.trend(&values), TrendLabel::Increasing);
        assert_eq!(strict.trend(&[1.0]), TrendLabel::InsufficientData);
        assert_eq!(
            strict.trend_with_window(&[1.0, 2.0, 3.0], 5),
            TrendLabel::InsufficientData
        );
    }

    #[test]
    fn test_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values).unwrap();
        assert!((m - 5.0).abs() < 1e-12);
        // Population std of this classic series is exactly 2
        assert!((population_std(&values, m) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_stays_within_bounds() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[0.1; 3]), Some(0.1));
        assert_eq!(mean(&[0.7; 10]), Some(0.7));

        let huge = [f64::MAX; 3];
        assert_eq!(mean(&huge), Some(f64::MAX));
        assert_eq!(population_std(&huge, f64::MAX), 0.0);

        let mixed = [f64::MAX, -f64::MAX, f64::MAX];
        let m = mean(&mixed).unwrap();
        assert!(m.is_finite());
        assert!((-f64::MAX..=f64::MAX).contains(&m));
        let std = population_std(&mixed, m);
        assert!(std.is_finite() && std >= 0.0);
    }

    #[test]
    fn test_population_std_symmetric_extremes() {
        // Deviations of +-MAX around zero give a std of exactly MAX
        let values = [f64::MAX, -f64::MAX];
        assert_eq!(population_std(&values, 0.0), f64::MAX);
    }

    #[test]
    fn test_channel_stat() {
        assert!(calc().channel_stat(&[]).is_none());

        let stat = calc().channel_stat(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((stat.mean - 2.5).abs() < 1e-12);
        assert!((stat.std - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(stat.trend, TrendLabel::Increasing);
    }
}
