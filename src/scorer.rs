//! Energy scoring and classification
//!
//! A fixed weighted sum over five normalized components, calibrated against the
//! day's own heart-rate statistics. Every intermediate value is clamped, so any
//! feature row, however out of range, yields a score in `[0, 100]` and a
//! confidence in `[0, 1]`.

use crate::types::{EnergyLevel, FeatureRow, Prediction};
use log::debug;
use serde::{Deserialize, Serialize};

/// Weight of last night's sleep quality
pub const WEIGHT_SLEEP: f64 = 30.0;
/// Weight of the circadian phase
pub const WEIGHT_CIRCADIAN: f64 = 25.0;
/// Weight of the heart-rate trend against the day's baseline
pub const WEIGHT_HEART_RATE: f64 = 20.0;
/// Weight of the typing speed delta
pub const WEIGHT_TYPING: f64 = 15.0;
/// Weight of the reaction time delta
pub const WEIGHT_REACTION: f64 = 10.0;

/// Scores at or above this are HIGH
pub const HIGH_THRESHOLD: f64 = 66.0;
/// Scores at or above this (and below HIGH) are MEDIUM
pub const MEDIUM_THRESHOLD: f64 = 33.0;
/// Distance from the nearest threshold that maps to full confidence
pub const CONFIDENCE_SPAN: f64 = 33.0;

/// Heart-rate baseline used when no bin has heart-rate data
pub const DEFAULT_HR_BASELINE: f64 = 70.0;
/// Heart-rate spread used when the day's spread is unavailable or degenerate
pub const DEFAULT_HR_STDDEV: f64 = 10.0;

/// z-scores are clamped to +/- this before mapping onto [0, 1]
const HR_Z_LIMIT: f64 = 2.0;

/// Day-level heart-rate statistics over bins that have data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateBaseline {
    pub mean: f64,
    pub stddev: f64,
    /// Number of bins that contributed
    pub bins: usize,
}

impl Default for HeartRateBaseline {
    fn default() -> Self {
        Self {
            mean: DEFAULT_HR_BASELINE,
            stddev: DEFAULT_HR_STDDEV,
            bins: 0,
        }
    }
}

impl HeartRateBaseline {
    /// Mean and population std of every positive, finite `hr_mean`
    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let values: Vec<f64> = rows
            .iter()
            .map(|r| r.hr_mean)
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();

        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();

        Self {
            mean,
            stddev: if stddev.is_finite() && stddev > 0.0 {
                stddev
            } else {
                DEFAULT_HR_STDDEV
            },
            bins: values.len(),
        }
    }

    /// z-score of a bin's heart-rate mean against the day
    pub fn z_score(&self, hr_mean: f64) -> f64 {
        if self.stddev == 0.0 || !self.stddev.is_finite() {
            return 0.0;
        }
        (hr_mean - self.mean) / self.stddev
    }
}

/// Normalized (0-1) contributions before weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub sleep: f64,
    pub circadian: f64,
    pub heart_rate: f64,
    pub typing: f64,
    pub reaction: f64,
}

impl ScoreComponents {
    pub fn from_row(row: &FeatureRow, baseline: &HeartRateBaseline) -> Self {
        let z = finite_or_zero(baseline.z_score(row.hr_mean)).clamp(-HR_Z_LIMIT, HR_Z_LIMIT);

        Self {
            sleep: unit(row.sleep_quality),
            circadian: circadian_alignment(row.cos_time_of_day),
            heart_rate: unit((z + HR_Z_LIMIT) / (2.0 * HR_Z_LIMIT)),
            typing: unit((row.typing_wpm_delta + 50.0) / 100.0),
            reaction: unit((100.0 - row.reaction_time_delta_ms) / 200.0),
        }
    }

    /// Weighted sum clamped to [0, 100]
    pub fn weighted_score(&self) -> f64 {
        let total = WEIGHT_SLEEP * self.sleep
            + WEIGHT_CIRCADIAN * self.circadian
            + WEIGHT_HEART_RATE * self.heart_rate
            + WEIGHT_TYPING * self.typing
            + WEIGHT_REACTION * self.reaction;
        total.clamp(0.0, 100.0)
    }
}

/// Circadian component, peaking at local noon and bottoming out at midnight.
///
/// `cos_time_of_day` is +1 at midnight and -1 at noon, so the phase is flipped
/// before mapping onto [0, 1].
pub fn circadian_alignment(cos_time_of_day: f64) -> f64 {
    unit((1.0 - finite_or_zero(cos_time_of_day)) / 2.0)
}

/// Map a score onto an energy level
pub fn classify(score: f64) -> EnergyLevel {
    if score >= HIGH_THRESHOLD {
        EnergyLevel::High
    } else if score >= MEDIUM_THRESHOLD {
        EnergyLevel::Medium
    } else {
        EnergyLevel::Low
    }
}

/// Distance to the nearer classification threshold, scaled to [0, 1]
pub fn confidence(score: f64) -> f64 {
    let distance = (score - HIGH_THRESHOLD)
        .abs()
        .min((score - MEDIUM_THRESHOLD).abs());
    unit(distance / CONFIDENCE_SPAN)
}

/// Stateless scorer for a day's feature rows
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyScorer;

impl EnergyScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score every row of a day, in order.
    ///
    /// The heart-rate baseline is computed once from the whole batch.
    pub fn score_day(&self, rows: &[FeatureRow]) -> Vec<Prediction> {
        if rows.is_empty() {
            return Vec::new();
        }

        let baseline = HeartRateBaseline::from_rows(rows);
        let predictions: Vec<Prediction> = rows
            .iter()
            .map(|row| self.score_row(row, &baseline))
            .collect();

        debug!(
            "Scored {} bins (hr baseline {:.1} +/- {:.1} over {} bins)",
            predictions.len(),
            baseline.mean,
            baseline.stddev,
            baseline.bins
        );

        predictions
    }

    /// Score a single row against a precomputed day baseline
    pub fn score_row(&self, row: &FeatureRow, baseline: &HeartRateBaseline) -> Prediction {
        let components = ScoreComponents::from_row(row, baseline);
        let score = components.weighted_score();

        Prediction {
            prediction_time: row.slot_start,
            level: classify(score),
            confidence: confidence(score),
            score,
            explanation: explain(score, row, &components, baseline),
        }
    }
}

/// Short summary of the factors that moved the score
fn explain(
    score: f64,
    row: &FeatureRow,
    components: &ScoreComponents,
    baseline: &HeartRateBaseline,
) -> String {
    let mut parts = vec![match classify(score) {
        EnergyLevel::High => format!("High energy predicted ({score:.0})."),
        EnergyLevel::Medium => format!("Moderate energy predicted ({score:.0})."),
        EnergyLevel::Low => format!("Low energy predicted ({score:.0})."),
    }];

    let mut factors = 0;

    if components.sleep > 0.8 {
        parts.push("Good sleep quality boosting energy.".to_string());
        factors += 1;
    } else if components.sleep < 0.5 {
        parts.push("Poor sleep may be reducing energy.".to_string());
        factors += 1;
    }

    if components.circadian > 0.75 {
        parts.push("Mid-day peak hours alignment.".to_string());
        factors += 1;
    } else if components.circadian < 0.25 {
        parts.push("Outside natural peak hours.".to_string());
        factors += 1;
    }

    if row.hr_mean > 0.0 && baseline.bins > 0 {
        if row.hr_mean > baseline.mean + 15.0 {
            parts.push("High heart rate may indicate stress or intense activity.".to_string());
            factors += 1;
        } else if row.hr_mean < baseline.mean - 10.0 {
            parts.push("Low heart rate indicates resting state.".to_string());
            factors += 1;
        }
    }

    if row.typing_wpm_delta >= 10.0 || row.reaction_time_delta_ms <= -30.0 {
        parts.push("Cognitive tests sharper than usual.".to_string());
        factors += 1;
    } else if row.typing_wpm_delta <= -10.0 || row.reaction_time_delta_ms >= 30.0 {
        parts.push("Cognitive tests slower than usual.".to_string());
        factors += 1;
    }

    if factors == 0 {
        parts.push("Based on balanced daily metrics.".to_string());
    }

    parts.join(" ")
}

fn unit(value: f64) -> f64 {
    finite_or_zero(value).clamp(0.0, 1.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn circadian_at(fraction_of_day: f64) -> f64 {
        circadian_alignment((fraction_of_day * 2.0 * PI).cos())
    }

    fn row_at(fraction_of_day: f64) -> FeatureRow {
        let radians = fraction_of_day * 2.0 * PI;
        FeatureRow {
            sin_time_of_day: radians.sin(),
            cos_time_of_day: radians.cos(),
            ..FeatureRow::empty(0)
        }
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify(66.0), EnergyLevel::High);
        assert_eq!(classify(65.999), EnergyLevel::Medium);
        assert_eq!(classify(33.0), EnergyLevel::Medium);
        assert_eq!(classify(32.999), EnergyLevel::Low);
        assert_eq!(classify(0.0), EnergyLevel::Low);
        assert_eq!(classify(100.0), EnergyLevel::High);
    }

    #[test]
    fn test_confidence() {
        assert_eq!(confidence(33.0), 0.0);
        assert_eq!(confidence(66.0), 0.0);
        assert_eq!(confidence(100.0), 1.0);
        assert!((confidence(0.0) - 1.0).abs() < 1e-12);
        assert!((confidence(49.5) - 0.5).abs() < 1e-12);
        assert!((confidence(76.0) - 10.0 / 33.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_heart_rate_uses_default_spread() {
        let mut rows = vec![FeatureRow::empty(0), FeatureRow::empty(1), FeatureRow::empty(2)];
        rows[0].hr_mean = 60.0;
        rows[1].hr_mean = 60.0;

        // Zero spread is degenerate: the default spread replaces it
        let baseline = HeartRateBaseline::from_rows(&rows);
        assert_eq!(baseline.mean, 60.0);
        assert_eq!(baseline.stddev, DEFAULT_HR_STDDEV);
        assert_eq!(baseline.bins, 2);

        assert_eq!(ScoreComponents::from_row(&rows[0], &baseline).heart_rate, 0.5);
        // Empty bin: z = (0 - 60) / 10, clamped to -2
        assert_eq!(ScoreComponents::from_row(&rows[2], &baseline).heart_rate, 0.0);
    }

    #[test]
    fn test_heart_rate_baseline_defaults() {
        let rows = vec![FeatureRow::empty(0), FeatureRow::empty(1)];
        assert_eq!(HeartRateBaseline::from_rows(&rows), HeartRateBaseline::default());

        // A single bin has no spread, so the default is used
        let mut single = FeatureRow::empty(0);
        single.hr_mean = 80.0;
        let baseline = HeartRateBaseline::from_rows(&[single]);
        assert_eq!(baseline.mean, 80.0);
        assert_eq!(baseline.stddev, DEFAULT_HR_STDDEV);
    }

    #[test]
    fn test_heart_rate_baseline_ignores_empty_bins() {
        let rows: Vec<FeatureRow> = [0.0, 60.0, 0.0, 80.0]
            .iter()
            .enumerate()
            .map(|(i, hr)| FeatureRow {
                hr_mean: *hr,
                ..FeatureRow::empty(i as i64)
            })
            .collect();

        let baseline = HeartRateBaseline::from_rows(&rows);
        assert_eq!(baseline.mean, 70.0);
        assert_eq!(baseline.stddev, 10.0);
        assert_eq!(baseline.bins, 2);
        assert_eq!(baseline.z_score(90.0), 2.0);
    }

    #[test]
    fn test_component_mapping() {
        let baseline = HeartRateBaseline {
            mean: 70.0,
            stddev: 10.0,
            bins: 10,
        };
        let row = FeatureRow {
            hr_mean: 80.0,
            sleep_quality: 0.85,
            typing_wpm_delta: 10.0,
            reaction_time_delta_ms: -40.0,
            ..row_at(0.5)
        };

        let c = ScoreComponents::from_row(&row, &baseline);
        assert!((c.sleep - 0.85).abs() < 1e-12);
        assert!((c.circadian - 1.0).abs() < 1e-12);
        assert!((c.heart_rate - 0.75).abs() < 1e-12);
        assert!((c.typing - 0.6).abs() < 1e-12);
        assert!((c.reaction - 0.7).abs() < 1e-12);

        let expected = 30.0 * 0.85 + 25.0 + 20.0 * 0.75 + 15.0 * 0.6 + 10.0 * 0.7;
        assert!((c.weighted_score() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_components_are_clamped() {
        let baseline = HeartRateBaseline::default();
        let row = FeatureRow {
            hr_mean: 500.0,
            sleep_quality: 4.0,
            typing_wpm_delta: 900.0,
            reaction_time_delta_ms: -900.0,
            ..row_at(0.5)
        };
        let c = ScoreComponents::from_row(&row, &baseline);
        assert_eq!(c.weighted_score(), 100.0);

        let row = FeatureRow {
            hr_mean: -500.0,
            sleep_quality: -4.0,
            typing_wpm_delta: -900.0,
            reaction_time_delta_ms: 900.0,
            ..row_at(0.0)
        };
        let c = ScoreComponents::from_row(&row, &baseline);
        assert_eq!(c.weighted_score(), 0.0);
    }

    #[test]
    fn test_circadian_peaks_at_noon() {
        assert!(circadian_at(0.0).abs() < 1e-12);
        assert!((circadian_at(0.5) - 1.0).abs() < 1e-12);
        assert!((circadian_at(0.25) - 0.5).abs() < 1e-12);
        assert!(circadian_at(11.0 / 24.0) > circadian_at(9.0 / 24.0));
        assert!(circadian_at(13.0 / 24.0) > circadian_at(17.0 / 24.0));
    }

    #[test]
    fn test_empty_day() {
        assert!(EnergyScorer::new().score_day(&[]).is_empty());
    }

    #[test]
    fn test_predictions_follow_rows() {
        let rows: Vec<FeatureRow> = (0..24)
            .map(|h| FeatureRow {
                slot_start: h * 3_600_000,
                ..row_at(h as f64 / 24.0)
            })
            .collect();

        let predictions = EnergyScorer::new().score_day(&rows);
        assert_eq!(predictions.len(), rows.len());
        for (row, prediction) in rows.iter().zip(&predictions) {
            assert_eq!(prediction.prediction_time, row.slot_start);
            assert_eq!(prediction.level, classify(prediction.score));
            assert!(!prediction.explanation.is_empty());
        }
    }

    #[test]
    fn test_explanation_mentions_factors() {
        let baseline = HeartRateBaseline {
            mean: 65.0,
            stddev: 8.0,
            bins: 12,
        };
        let row = FeatureRow {
            hr_mean: 90.0,
            sleep_quality: 1.0,
            ..row_at(0.5)
        };
        let prediction = EnergyScorer::new().score_row(&row, &baseline);
        assert!(prediction.explanation.starts_with("High energy predicted"));
        assert!(prediction.explanation.contains("Good sleep quality"));
        assert!(prediction.explanation.contains("Mid-day peak"));
        assert!(prediction.explanation.contains("High heart rate"));
    }

    proptest! {
        #[test]
        fn prop_score_and_confidence_in_range(
            hr_mean in prop::num::f64::ANY,
            hr_std in prop::num::f64::ANY,
            sleep_quality in prop::num::f64::ANY,
            cos in prop::num::f64::ANY,
            typing in prop::num::f64::ANY,
            reaction in prop::num::f64::ANY,
            other_hr in -500.0f64..500.0,
        ) {
            let row = FeatureRow {
                slot_start: 0,
                hr_mean,
                hr_std,
                sleep_duration_hours: 0.0,
                sleep_quality,
                sin_time_of_day: 0.0,
                cos_time_of_day: cos,
                typing_wpm_delta: typing,
                reaction_time_delta_ms: reaction,
            };
            let other = FeatureRow { hr_mean: other_hr, ..FeatureRow::empty(1) };

            for prediction in EnergyScorer::new().score_day(&[row, other]) {
                prop_assert!((0.0..=100.0).contains(&prediction.score));
                prop_assert!((0.0..=1.0).contains(&prediction.confidence));
            }
        }

        #[test]
        fn prop_classification_matches_thresholds(score in 0.0f64..=100.0) {
            let level = classify(score);
            let expected = if score >= 66.0 {
                EnergyLevel::High
            } else if score >= 33.0 {
                EnergyLevel::Medium
            } else {
                EnergyLevel::Low
            };
            prop_assert_eq!(level, expected);
        }
    }
}
