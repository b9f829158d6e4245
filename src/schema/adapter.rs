//! Loading energy.raw_sample.v1 records into a sample store

use crate::error::ComputeError;
use crate::provider::MemorySampleStore;
use crate::schema::raw_sample::*;
use log::debug;

/// Adapter for turning raw sample records into a [`MemorySampleStore`]
pub struct RawSampleAdapter;

impl RawSampleAdapter {
    /// Parse a JSON string containing an array of RawSamples
    pub fn parse_array(json: &str) -> Result<Vec<RawSample>, ComputeError> {
        let samples: Vec<RawSample> = serde_json::from_str(json)?;
        Ok(samples)
    }

    /// Parse NDJSON (newline-delimited JSON) containing RawSamples
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawSample>, ComputeError> {
        let mut samples = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawSample>(trimmed) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(samples)
    }

    /// Parse either a JSON array or NDJSON, picked by the first non-blank character
    pub fn parse(input: &str) -> Result<Vec<RawSample>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of samples, returning only the failures
    pub fn validate_samples(samples: &[RawSample]) -> Vec<ValidationResult> {
        samples
            .iter()
            .enumerate()
            .filter_map(|(idx, sample)| {
                sample.validate().err().map(|error| ValidationResult {
                    index: idx,
                    sample_id: sample.sample_id.clone(),
                    error,
                })
            })
            .collect()
    }

    /// Validate every sample and load them into a new store.
    ///
    /// The first invalid sample aborts the load.
    pub fn into_store(samples: Vec<RawSample>) -> Result<MemorySampleStore, ComputeError> {
        let mut store = MemorySampleStore::new();

        for (idx, sample) in samples.into_iter().enumerate() {
            if let Err(e) = sample.validate() {
                return Err(ComputeError::ParseError(format!(
                    "Invalid sample at index {}: {}",
                    idx, e
                )));
            }

            match sample.payload {
                SamplePayload::HeartRate(s) => store.insert_heart_rate(s),
                SamplePayload::Sleep(s) => store.insert_sleep(s),
                SamplePayload::Typing(t) => store.insert_typing(t),
                SamplePayload::Reaction(r) => store.insert_reaction(r),
            }
        }

        debug!("Loaded {} raw samples into the store", store.len());
        Ok(store)
    }
}

/// A sample that failed validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Position of the sample in its batch
    pub index: usize,
    pub sample_id: Option<String>,
    pub error: ValidationError,
}
