//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Energy.
//! It runs a local day through both stages:
//!
//! 1. [`BinFeatureBuilder`] - raw samples to ordered feature rows
//! 2. [`EnergyScorer`] - feature rows to ordered prediction rows
//!
//! and optionally wraps the result in an `energy.forecast.v1` payload.

use crate::calendar::{parse_date, parse_utc_offset};
use crate::config::EngineConfig;
use crate::encoder::PredictionEncoder;
use crate::error::ComputeError;
use crate::features::{BinFeatureBuilder, DayFeatures};
use crate::provider::SampleProvider;
use crate::schema::RawSampleAdapter;
use crate::scorer::EnergyScorer;
use crate::types::{FeatureRow, Prediction};
use chrono::{Days, NaiveDate, TimeZone};
use log::info;
use serde::{Deserialize, Serialize};

/// Features and predictions for one local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub features: DayFeatures,
    /// One prediction per feature row, same order
    pub predictions: Vec<Prediction>,
}

impl DayForecast {
    pub fn date(&self) -> NaiveDate {
        self.features.date
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.features.rows
    }
}

/// Convert raw samples to an `energy.forecast.v1` JSON payload.
///
/// # Arguments
/// * `samples` - energy.raw_sample.v1 records, as a JSON array or NDJSON
/// * `date` - Local calendar date (YYYY-MM-DD)
/// * `timezone` - `UTC`, `Z`, or a `±HH:MM` offset
/// * `bin_width_minutes` - 30 or 60; anything else falls back to 60
///
/// # Example
/// ```ignore
/// let forecast_json = samples_to_forecast_json(ndjson, "2024-01-15", "+01:00", 60)?;
/// ```
pub fn samples_to_forecast_json(
    samples: &str,
    date: &str,
    timezone: &str,
    bin_width_minutes: u32,
) -> Result<String, ComputeError> {
    let config = EngineConfig::default().with_bin_width(bin_width_minutes);
    EnergyProcessor::new(config).process_samples(samples, date, timezone)
}

/// Convert raw samples to the day's feature rows as a JSON array.
pub fn samples_to_features_json(
    samples: &str,
    date: &str,
    timezone: &str,
    bin_width_minutes: u32,
) -> Result<String, ComputeError> {
    let config = EngineConfig::default().with_bin_width(bin_width_minutes);
    EnergyProcessor::new(config).features_from_samples(samples, date, timezone)
}

/// Processor holding the engine configuration and a forecast encoder.
///
/// The builder and scorer only read their configuration, so one processor can
/// serve any number of days and providers.
pub struct EnergyProcessor {
    config: EngineConfig,
    builder: BinFeatureBuilder,
    scorer: EnergyScorer,
    encoder: PredictionEncoder,
}

impl Default for EnergyProcessor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EnergyProcessor {
    /// Create a processor for the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            builder: BinFeatureBuilder::new(&config),
            scorer: EnergyScorer::new(),
            encoder: PredictionEncoder::new(),
            config,
        }
    }

    /// Create a processor from an `EngineConfig` JSON document
    pub fn from_config_json(json: &str) -> Result<Self, ComputeError> {
        Ok(Self::new(EngineConfig::from_json(json)?))
    }

    /// Replace the encoder (e.g. to pin the producer instance ID)
    pub fn with_encoder(mut self, encoder: PredictionEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the feature rows for `date` without scoring them
    pub fn build_features<P, Tz>(&self, provider: &P, date: NaiveDate, tz: &Tz) -> DayFeatures
    where
        P: SampleProvider + ?Sized,
        Tz: TimeZone,
    {
        self.builder.build_day(provider, date, tz)
    }

    /// Build and score one local day
    pub fn predict_day<P, Tz>(&self, provider: &P, date: NaiveDate, tz: &Tz) -> DayForecast
    where
        P: SampleProvider + ?Sized,
        Tz: TimeZone,
    {
        let features = self.builder.build_day(provider, date, tz);
        let predictions = self.scorer.score_day(&features.rows);
        DayForecast {
            features,
            predictions,
        }
    }

    /// Build and score `days` consecutive local days starting at `start`
    pub fn predict_days<P, Tz>(
        &self,
        provider: &P,
        start: NaiveDate,
        days: u32,
        tz: &Tz,
    ) -> Vec<DayForecast>
    where
        P: SampleProvider + ?Sized,
        Tz: TimeZone,
    {
        (0..days)
            .map_while(|offset| start.checked_add_days(Days::new(offset as u64)))
            .map(|date| self.predict_day(provider, date, tz))
            .collect()
    }

    /// Predict one day and encode it as an `energy.forecast.v1` JSON payload
    pub fn predict_day_json<P, Tz>(
        &self,
        provider: &P,
        date: NaiveDate,
        tz: &Tz,
        timezone_label: &str,
    ) -> Result<String, ComputeError>
    where
        P: SampleProvider + ?Sized,
        Tz: TimeZone,
    {
        let forecast = self.predict_day(provider, date, tz);
        self.encoder.encode_to_json(&forecast, timezone_label)
    }

    /// Load raw samples, predict `date`, and encode the forecast
    pub fn process_samples(
        &self,
        samples: &str,
        date: &str,
        timezone: &str,
    ) -> Result<String, ComputeError> {
        let date = parse_date(date)?;
        let tz = parse_utc_offset(timezone)?;
        let store = RawSampleAdapter::into_store(RawSampleAdapter::parse(samples)?)?;

        info!("Predicting {} from {} raw samples", date, store.len());
        self.predict_day_json(&store, date, &tz, timezone.trim())
    }

    /// Load raw samples and return the feature rows for `date` as JSON
    pub fn features_from_samples(
        &self,
        samples: &str,
        date: &str,
        timezone: &str,
    ) -> Result<String, ComputeError> {
        let date = parse_date(date)?;
        let tz = parse_utc_offset(timezone)?;
        let store = RawSampleAdapter::into_store(RawSampleAdapter::parse(samples)?)?;

        let features = self.builder.build_day(&store, date, &tz);
        serde_json::to_string_pretty(&features.rows)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::local_day_start_ms;
    use crate::config::BaselinePolicy;
    use crate::encoder::FORECAST_SCHEMA_VERSION;
    use crate::provider::MemorySampleStore;
    use crate::scorer::{circadian_alignment, WEIGHT_CIRCADIAN, WEIGHT_SLEEP};
    use crate::types::{HeartRateSample, ReactionResult, SleepSession, TypingResult};
    use chrono::{FixedOffset, Utc};
    use pretty_assertions::assert_eq;

    const HOUR: i64 = 3_600_000;
    const MINUTE: i64 = 60_000;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn rested_store(day_start: i64) -> MemorySampleStore {
        // 480-minute night ending an hour before the day starts
        MemorySampleStore::new().with_sleep([SleepSession::completed(
            day_start - 9 * HOUR,
            day_start - HOUR,
        )])
    }

    fn busy_store(day_start: i64) -> MemorySampleStore {
        let mut store = rested_store(day_start)
            .with_typing([
                TypingResult::new(day_start - 2 * 24 * HOUR, 48, 95.0),
                TypingResult::new(day_start + 10 * HOUR, 58, 97.0),
            ])
            .with_reaction([
                ReactionResult::new(day_start - 24 * HOUR, 320),
                ReactionResult::new(day_start + 14 * HOUR, 290),
            ]);
        for minute in (0..24 * 60).step_by(7) {
            let bpm = 58 + (minute % 40) as u32;
            store.insert_heart_rate(HeartRateSample::new(day_start + minute * MINUTE, bpm));
        }
        store
    }

    #[test]
    fn test_predictions_follow_rows() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let store = busy_store(local_day_start_ms(date(), &tz));
        let forecast = EnergyProcessor::default().predict_day(&store, date(), &tz);

        assert_eq!(forecast.rows().len(), 24);
        assert_eq!(forecast.predictions.len(), forecast.rows().len());
        for (row, prediction) in forecast.rows().iter().zip(&forecast.predictions) {
            assert_eq!(prediction.prediction_time, row.slot_start);
            assert!((0.0..=100.0).contains(&prediction.score));
            assert!((0.0..=1.0).contains(&prediction.confidence));
        }
    }

    #[test]
    fn test_determinism() {
        let store = busy_store(local_day_start_ms(date(), &Utc));
        let config = EngineConfig::default().with_bin_width(30);

        let first = EnergyProcessor::new(config.clone()).predict_day(&store, date(), &Utc);
        let second = EnergyProcessor::new(config).predict_day(&store, date(), &Utc);

        assert_eq!(first.predictions, second.predictions);
        assert_eq!(first.features, second.features);
    }

    #[test]
    fn test_rested_scenario() {
        let day_start = local_day_start_ms(date(), &Utc);
        let store = rested_store(day_start);
        let forecast = EnergyProcessor::default().predict_day(&store, date(), &Utc);

        assert_eq!(forecast.rows().len(), 24);
        for row in forecast.rows() {
            assert_eq!(row.sleep_duration_hours, 8.0);
            assert_eq!(row.sleep_quality, 1.0);
        }

        // Removing the circadian term leaves the same score in every bin
        let residuals: Vec<f64> = forecast
            .rows()
            .iter()
            .zip(&forecast.predictions)
            .map(|(row, p)| p.score - WEIGHT_CIRCADIAN * circadian_alignment(row.cos_time_of_day))
            .collect();
        for residual in &residuals {
            assert!((residual - residuals[0]).abs() < 1e-9);
        }

        let peak = forecast
            .predictions
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.score.total_cmp(&b.1.score))
            .map(|(idx, _)| idx)
            .unwrap();
        assert_eq!(peak, 12);
    }

    #[test]
    fn test_no_sleep_scenario() {
        let day_start = local_day_start_ms(date(), &Utc);
        let processor = EnergyProcessor::default();

        let rested = processor.predict_day(&rested_store(day_start), date(), &Utc);
        let tired = processor.predict_day(&MemorySampleStore::new(), date(), &Utc);

        for (r, t) in rested.predictions.iter().zip(&tired.predictions) {
            assert!((r.score - t.score - WEIGHT_SLEEP).abs() < 1e-9);
        }
        assert!(tired.rows().iter().all(|row| row.sleep_quality == 0.0));
    }

    #[test]
    fn test_predict_days() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let forecasts = EnergyProcessor::default().predict_days(&MemorySampleStore::new(), date(), 3, &tz);

        let dates: Vec<NaiveDate> = forecasts.iter().map(DayForecast::date).collect();
        assert_eq!(
            dates,
            vec![
                date(),
                NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(),
            ]
        );
        assert_eq!(
            forecasts[1].rows()[0].slot_start,
            forecasts[0].rows()[23].slot_start + HOUR
        );
    }

    #[test]
    fn test_baseline_policy_reaches_rows() {
        let day_start = local_day_start_ms(date(), &Utc);
        let store = MemorySampleStore::new().with_typing([TypingResult::new(day_start + HOUR, 50, 99.0)]);

        let zero_fill = EnergyProcessor::default().build_features(&store, date(), &Utc);
        let strict = EnergyProcessor::new(
            EngineConfig::default().with_baseline_policy(BaselinePolicy::RequireHistory),
        )
        .build_features(&store, date(), &Utc);

        assert_eq!(zero_fill.rows[1].typing_wpm_delta, 50.0);
        assert_eq!(strict.rows[1].typing_wpm_delta, 0.0);
    }

    fn sample_ndjson() -> &'static str {
        // 2024-01-15 in +01:00 starts at 2024-01-14T23:00:00Z (1705273200000)
        r#"{"schema_version":"energy.raw_sample.v1","source":"sleep","start_ms":1705240800000,"end_ms":1705269600000}
{"schema_version":"energy.raw_sample.v1","source":"heart_rate","timestamp_ms":1705305600000,"bpm":72}
{"schema_version":"energy.raw_sample.v1","source":"heart_rate","timestamp_ms":1705305660000,"bpm":76}
{"schema_version":"energy.raw_sample.v1","source":"typing","timestamp_ms":1705309200000,"wpm":61,"accuracy":96.5}"#
    }

    #[test]
    fn test_samples_to_forecast_json() {
        let json = samples_to_forecast_json(sample_ndjson(), "2024-01-15", "+01:00", 30).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["schema_version"], FORECAST_SCHEMA_VERSION);
        assert_eq!(parsed["date"], "2024-01-15");
        assert_eq!(parsed["timezone"], "+01:00");
        assert_eq!(parsed["bin_width_minutes"], 30);
        assert_eq!(parsed["quality"]["has_sleep"], true);

        let predictions = parsed["predictions"].as_array().unwrap();
        assert_eq!(predictions.len(), 48);
        assert_eq!(predictions[0]["prediction_time"], 1_705_273_200_000_i64);
    }

    #[test]
    fn test_samples_to_features_json() {
        let json = samples_to_features_json(sample_ndjson(), "2024-01-15", "+01:00", 60).unwrap();
        let rows: Vec<FeatureRow> = serde_json::from_str(&json).unwrap();

        assert_eq!(rows.len(), 24);
        // 08:00Z is 09:00 local
        assert_eq!(rows[9].hr_mean, 74.0);
        assert_eq!(rows[9].hr_std, 2.0);
        assert_eq!(rows[0].sleep_duration_hours, 8.0);
        // No typing history: the delta is the raw speed
        assert_eq!(rows[10].typing_wpm_delta, 61.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            samples_to_forecast_json(sample_ndjson(), "15.01.2024", "UTC", 60),
            Err(ComputeError::DateParseError(_))
        ));
        assert!(matches!(
            samples_to_forecast_json(sample_ndjson(), "2024-01-15", "Mars/Olympus", 60),
            Err(ComputeError::InvalidTimezone(_))
        ));
        assert!(matches!(
            samples_to_forecast_json("not json", "2024-01-15", "UTC", 60),
            Err(ComputeError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_config_json() {
        let processor =
            EnergyProcessor::from_config_json(r#"{"bin_width_minutes": 30}"#).unwrap();
        assert_eq!(processor.config().bin_width_minutes, 30);
        assert_eq!(
            processor.config().baseline_window_days,
            crate::config::DEFAULT_BASELINE_WINDOW_DAYS
        );

        assert!(matches!(
            EnergyProcessor::from_config_json("{"),
            Err(ComputeError::InvalidConfig(_))
        ));
    }
}
