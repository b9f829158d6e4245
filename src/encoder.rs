//! Forecast encoding
//!
//! Wraps a day's prediction rows in the versioned `energy.forecast.v1`
//! envelope handed to the scheduler. The envelope carries producer metadata and
//! a small data-quality summary; the prediction rows themselves are copied
//! through untouched.

use crate::error::ComputeError;
use crate::pipeline::DayForecast;
use crate::types::Prediction;
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current forecast schema version
pub const FORECAST_SCHEMA_VERSION: &str = "energy.forecast.v1";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// What the day's forecast was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastQuality {
    /// Share of bins with at least one heart-rate sample (0.0 - 1.0)
    pub heart_rate_coverage: f64,
    /// Whether last night's sleep was found
    pub has_sleep: bool,
    /// Typing tests in the baseline window
    pub typing_baseline_samples: usize,
    /// Reaction tests in the baseline window
    pub reaction_baseline_samples: usize,
}

/// The `energy.forecast.v1` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub schema_version: String,
    pub producer: ForecastProducer,
    /// Local calendar date (YYYY-MM-DD)
    pub date: String,
    /// Timezone label the day was computed in
    pub timezone: String,
    pub bin_width_minutes: u32,
    pub quality: ForecastQuality,
    /// One prediction per bin, in bin order
    pub predictions: Vec<Prediction>,
}

/// Encoder for forecast payloads
pub struct PredictionEncoder {
    instance_id: String,
}

impl Default for PredictionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode a day's forecast
    pub fn encode(&self, forecast: &DayForecast, timezone: &str) -> ForecastPayload {
        let features = &forecast.features;

        let producer = ForecastProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let bins_with_hr = features.rows.iter().filter(|r| r.hr_mean > 0.0).count();
        let heart_rate_coverage = if features.rows.is_empty() {
            0.0
        } else {
            bins_with_hr as f64 / features.rows.len() as f64
        };

        let quality = ForecastQuality {
            heart_rate_coverage,
            has_sleep: features.sleep.is_some(),
            typing_baseline_samples: features.baselines.typing_wpm.sample_count,
            reaction_baseline_samples: features.baselines.reaction_ms.sample_count,
        };

        ForecastPayload {
            schema_version: FORECAST_SCHEMA_VERSION.to_string(),
            producer,
            date: features.date.format("%Y-%m-%d").to_string(),
            timezone: timezone.to_string(),
            bin_width_minutes: features.bin_width_minutes,
            quality,
            predictions: forecast.predictions.clone(),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        forecast: &DayForecast,
        timezone: &str,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(forecast, timezone);
        serde_json::to_string_pretty(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
