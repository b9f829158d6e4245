//! energy.raw_sample.v1 schema definition
//!
//! One record per raw sample, tagged by `source`. The payload fields sit next
//! to the envelope fields:
//!
//! ```json
//! {"schema_version":"energy.raw_sample.v1","source":"heart_rate","timestamp_ms":1705305600000,"bpm":72}
//! ```

use crate::types::{HeartRateSample, ReactionResult, SampleSource, SleepSession, TypingResult};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "energy.raw_sample.v1";

/// A single raw sample record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Schema version (must be "energy.raw_sample.v1")
    pub schema_version: String,
    /// Optional record identifier, echoed back in validation reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    /// Source-specific fields
    #[serde(flatten)]
    pub payload: SamplePayload,
}

/// Source-tagged sample payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SamplePayload {
    HeartRate(HeartRateSample),
    Sleep(SleepSession),
    Typing(TypingResult),
    Reaction(ReactionResult),
}

impl RawSample {
    fn new(payload: SamplePayload) -> Self {
        RawSample {
            schema_version: SCHEMA_VERSION.to_string(),
            sample_id: Some(uuid::Uuid::new_v4().to_string()),
            payload,
        }
    }

    pub fn heart_rate(sample: HeartRateSample) -> Self {
        Self::new(SamplePayload::HeartRate(sample))
    }

    pub fn sleep(session: SleepSession) -> Self {
        Self::new(SamplePayload::Sleep(session))
    }

    pub fn typing(result: TypingResult) -> Self {
        Self::new(SamplePayload::Typing(result))
    }

    pub fn reaction(result: ReactionResult) -> Self {
        Self::new(SamplePayload::Reaction(result))
    }

    /// Replace the generated sample ID
    pub fn with_sample_id(mut self, sample_id: impl Into<String>) -> Self {
        self.sample_id = Some(sample_id.into());
        self
    }

    pub fn source(&self) -> SampleSource {
        match &self.payload {
            SamplePayload::HeartRate(_) => SampleSource::HeartRate,
            SamplePayload::Sleep(_) => SampleSource::Sleep,
            SamplePayload::Typing(_) => SampleSource::Typing,
            SamplePayload::Reaction(_) => SampleSource::Reaction,
        }
    }

    /// Timestamp the store indexes this sample by (session start for sleep)
    pub fn timestamp_ms(&self) -> i64 {
        match &self.payload {
            SamplePayload::HeartRate(s) => s.timestamp_ms,
            SamplePayload::Sleep(s) => s.start_ms,
            SamplePayload::Typing(t) => t.timestamp_ms,
            SamplePayload::Reaction(r) => r.timestamp_ms,
        }
    }

    /// Validate the record against the schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        match &self.payload {
            SamplePayload::HeartRate(s) if s.bpm == 0 => {
                Err(ValidationError::NonPositiveHeartRate { bpm: s.bpm })
            }
            SamplePayload::Sleep(s) => match s.end_ms {
                Some(end_ms) if end_ms < s.start_ms => Err(ValidationError::SleepEndsBeforeStart {
                    start_ms: s.start_ms,
                    end_ms,
                }),
                _ => Ok(()),
            },
            SamplePayload::Typing(t) if !(0.0..=100.0).contains(&t.accuracy) => {
                Err(ValidationError::AccuracyOutOfRange {
                    accuracy: t.accuracy,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Validation errors for raw samples
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Heart rate must be positive, got {bpm} bpm")]
    NonPositiveHeartRate { bpm: u32 },

    #[error("Sleep session ends at {end_ms} before it starts at {start_ms}")]
    SleepEndsBeforeStart { start_ms: i64, end_ms: i64 },

    #[error("Typing accuracy must be within 0-100, got {accuracy}")]
    AccuracyOutOfRange { accuracy: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_heart_rate_sample() {
        let sample = RawSample::heart_rate(HeartRateSample::new(1_705_305_600_000, 72));
        let json = serde_json::to_string(&sample).unwrap();

        assert!(json.contains("energy.raw_sample.v1"));
        assert!(json.contains(r#""source":"heart_rate""#));
        assert!(json.contains(r#""bpm":72"#));
        assert!(sample.sample_id.is_some());
    }

    #[test]
    fn test_deserialize_sleep_sample() {
        let json = r#"{
            "schema_version": "energy.raw_sample.v1",
            "sample_id": "night-1",
            "source": "sleep",
            "start_ms": 1705276800000,
            "end_ms": 1705305600000,
            "duration_minutes": 480
        }"#;

        let sample: RawSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.source(), SampleSource::Sleep);
        assert_eq!(sample.timestamp_ms(), 1_705_276_800_000);
        assert_eq!(sample.sample_id.as_deref(), Some("night-1"));
        match sample.payload {
            SamplePayload::Sleep(session) => {
                assert!(session.is_completed());
                assert_eq!(session.duration_hours(), 8.0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_typing_with_integer_accuracy() {
        let json = r#"{"schema_version":"energy.raw_sample.v1","source":"typing","timestamp_ms":1000,"wpm":55,"accuracy":97}"#;
        let sample: RawSample = serde_json::from_str(json).unwrap();
        assert!(matches!(
            sample.payload,
            SamplePayload::Typing(TypingResult { wpm: 55, accuracy, .. }) if accuracy == 97.0
        ));
        assert!(sample.validate().is_ok());
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let json = r#"{"schema_version":"energy.raw_sample.v1","source":"steps","timestamp_ms":1000,"count":10}"#;
        assert!(serde_json::from_str::<RawSample>(json).is_err());
    }

    #[test]
    fn test_negative_reaction_time_fails_to_parse() {
        let json = r#"{"schema_version":"energy.raw_sample.v1","source":"reaction","timestamp_ms":1000,"median_ms":-5}"#;
        assert!(serde_json::from_str::<RawSample>(json).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(RawSample::reaction(ReactionResult::new(0, 280)).validate().is_ok());
        assert!(RawSample::sleep(SleepSession::ongoing(0)).validate().is_ok());

        assert_eq!(
            RawSample::heart_rate(HeartRateSample::new(0, 0)).validate(),
            Err(ValidationError::NonPositiveHeartRate { bpm: 0 })
        );

        let backwards = SleepSession {
            start_ms: 10,
            end_ms: Some(5),
            duration_minutes: None,
            synced: false,
        };
        assert!(matches!(
            RawSample::sleep(backwards).validate(),
            Err(ValidationError::SleepEndsBeforeStart { .. })
        ));

        assert!(matches!(
            RawSample::typing(TypingResult::new(0, 60, 101.0)).validate(),
            Err(ValidationError::AccuracyOutOfRange { .. })
        ));
        assert!(RawSample::typing(TypingResult::new(0, 60, f64::NAN))
            .validate()
            .is_err());

        let mut wrong_version = RawSample::reaction(ReactionResult::new(0, 280));
        wrong_version.schema_version = "energy.raw_sample.v0".to_string();
        assert!(matches!(
            wrong_version.validate(),
            Err(ValidationError::InvalidSchemaVersion { .. })
        ));
    }
}
