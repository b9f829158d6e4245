//! Core types for the Synheart Energy pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw samples read from the host store, per-bin feature rows, and
//! the prediction rows handed back to the scheduler.

use serde::{Deserialize, Serialize};

/// Raw sample sources read by the feature builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    HeartRate,
    Sleep,
    Typing,
    Reaction,
}

impl SampleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleSource::HeartRate => "heart_rate",
            SampleSource::Sleep => "sleep",
            SampleSource::Typing => "typing",
            SampleSource::Reaction => "reaction",
        }
    }
}

/// A single heart-rate reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Timestamp in epoch milliseconds
    pub timestamp_ms: i64,
    /// Beats per minute
    pub bpm: u32,
    /// Whether this record has been synced to remote storage
    #[serde(default)]
    pub synced: bool,
}

impl HeartRateSample {
    pub fn new(timestamp_ms: i64, bpm: u32) -> Self {
        Self {
            timestamp_ms,
            bpm,
            synced: false,
        }
    }
}

/// A sleep session. `end_ms` is `None` while the session is still in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    /// Sleep start time in epoch milliseconds
    pub start_ms: i64,
    /// Sleep end time in epoch milliseconds
    #[serde(default)]
    pub end_ms: Option<i64>,
    /// Recorded duration in minutes
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub synced: bool,
}

impl SleepSession {
    /// Create a completed session; the duration is derived from the bounds.
    pub fn completed(start_ms: i64, end_ms: i64) -> Self {
        let minutes = u32::try_from((end_ms - start_ms).max(0) / 60_000).unwrap_or(u32::MAX);
        Self {
            start_ms,
            end_ms: Some(end_ms),
            duration_minutes: Some(minutes),
            synced: false,
        }
    }

    /// Create a session that has not ended yet
    pub fn ongoing(start_ms: i64) -> Self {
        Self {
            start_ms,
            end_ms: None,
            duration_minutes: None,
            synced: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.end_ms, Some(end) if end >= self.start_ms)
    }

    /// Sleep duration in hours.
    ///
    /// Prefers the recorded duration and falls back to the session bounds.
    pub fn duration_hours(&self) -> f64 {
        match (self.duration_minutes, self.end_ms) {
            (Some(minutes), _) => minutes as f64 / 60.0,
            (None, Some(end)) if end >= self.start_ms => {
                (end - self.start_ms) as f64 / 3_600_000.0
            }
            _ => 0.0,
        }
    }
}

/// Result of a typing speed test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingResult {
    /// Timestamp in epoch milliseconds
    pub timestamp_ms: i64,
    /// Words per minute
    pub wpm: u32,
    /// Accuracy percentage (0-100)
    pub accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chars: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub synced: bool,
}

impl TypingResult {
    pub fn new(timestamp_ms: i64, wpm: u32, accuracy: f64) -> Self {
        Self {
            timestamp_ms,
            wpm,
            accuracy,
            total_chars: None,
            errors: None,
            duration_secs: None,
            synced: false,
        }
    }
}

/// Result of a reaction time test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionResult {
    /// Timestamp in epoch milliseconds
    pub timestamp_ms: i64,
    /// Median reaction time in milliseconds
    pub median_ms: u32,
    /// Number of trials in the test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_count: Option<u32>,
    #[serde(default)]
    pub synced: bool,
}

impl ReactionResult {
    pub fn new(timestamp_ms: i64, median_ms: u32) -> Self {
        Self {
            timestamp_ms,
            median_ms,
            test_count: None,
            synced: false,
        }
    }
}

/// Aggregated features for a single time bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Bin start in epoch milliseconds
    pub slot_start: i64,
    /// Heart rate mean in bpm (0.0 when the bin has no samples)
    pub hr_mean: f64,
    /// Heart rate population standard deviation in bpm
    pub hr_std: f64,
    /// Last night's sleep duration in hours
    pub sleep_duration_hours: f64,
    /// Last night's sleep quality (0.0 - 1.0)
    pub sleep_quality: f64,
    /// Time of day, sine component of the circular encoding
    pub sin_time_of_day: f64,
    /// Time of day, cosine component of the circular encoding
    pub cos_time_of_day: f64,
    /// Typing speed delta from the rolling baseline (wpm)
    pub typing_wpm_delta: f64,
    /// Reaction time delta from the rolling baseline (ms)
    pub reaction_time_delta_ms: f64,
}

impl FeatureRow {
    /// Row with every feature at its neutral value
    pub fn empty(slot_start: i64) -> Self {
        Self {
            slot_start,
            hr_mean: 0.0,
            hr_std: 0.0,
            sleep_duration_hours: 0.0,
            sleep_quality: 0.0,
            sin_time_of_day: 0.0,
            cos_time_of_day: 0.0,
            typing_wpm_delta: 0.0,
            reaction_time_delta_ms: 0.0,
        }
    }
}

/// Classified energy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyLevel::Low => "LOW",
            EnergyLevel::Medium => "MEDIUM",
            EnergyLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Energy prediction for a single time bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Bin start in epoch milliseconds, inherited from the feature row
    pub prediction_time: i64,
    /// Classified energy level
    pub level: EnergyLevel,
    /// Distance from the nearest classification threshold (0.0 - 1.0)
    pub confidence: f64,
    /// Weighted energy score (0 - 100)
    pub score: f64,
    /// Short human-readable summary of the dominant factors
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_session_duration() {
        let session = SleepSession::completed(0, 8 * 3_600_000);
        assert_eq!(session.duration_minutes, Some(480));
        assert_eq!(session.duration_hours(), 8.0);

        let backwards = SleepSession::completed(1_000, 0);
        assert_eq!(backwards.duration_minutes, Some(0));
    }

    #[test]
    fn test_completed_session_saturates_huge_spans() {
        let session = SleepSession::completed(i64::MIN / 2, i64::MAX / 2);
        assert_eq!(session.duration_minutes, Some(u32::MAX));
    }
}
