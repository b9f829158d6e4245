//! Bin feature derivation
//!
//! This module turns one local day of raw samples into fixed-width feature bins:
//! - Heart-rate mean and population standard deviation per bin
//! - Last night's sleep duration and quality, shared by every bin of the day
//! - Circular time-of-day encoding
//! - Typing and reaction deltas against the rolling baseline

use crate::baseline::CognitiveBaselines;
use crate::calendar::{day_bounds, fraction_of_day, DayBounds};
use crate::config::{BaselinePolicy, BinWidth, EngineConfig};
use crate::provider::{or_no_data, SampleProvider};
use crate::types::{FeatureRow, SampleSource, SleepSession};
use chrono::{NaiveDate, TimeZone};
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Day-level sleep context derived from last night's session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SleepContext {
    /// Sleep duration in hours
    pub duration_hours: f64,
    /// Duration-derived quality (0.0 - 1.0)
    pub quality: f64,
}

impl SleepContext {
    pub fn from_session(session: &SleepSession) -> Self {
        let duration_hours = session.duration_hours();
        Self {
            duration_hours,
            quality: sleep_quality(duration_hours),
        }
    }
}

/// Everything derived for one local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFeatures {
    pub date: NaiveDate,
    pub day_start_ms: i64,
    pub day_end_ms: i64,
    pub bin_width_minutes: u32,
    /// Last night's sleep, `None` when no completed session was found
    pub sleep: Option<SleepContext>,
    pub baselines: CognitiveBaselines,
    /// Ordered feature rows covering the whole day
    pub rows: Vec<FeatureRow>,
}

/// Builds ordered feature rows for a local calendar day
#[derive(Debug, Clone)]
pub struct BinFeatureBuilder {
    bin_width: BinWidth,
    baseline_window_days: u32,
    baseline_policy: BaselinePolicy,
}

impl Default for BinFeatureBuilder {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl BinFeatureBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            bin_width: config.bin_width(),
            baseline_window_days: config.baseline_window(),
            baseline_policy: config.baseline_policy,
        }
    }

    pub fn bin_width(&self) -> BinWidth {
        self.bin_width
    }

    /// Build the ordered feature rows for `date` in `tz`
    pub fn build_for<P, Tz>(&self, provider: &P, date: NaiveDate, tz: &Tz) -> Vec<FeatureRow>
    where
        P: SampleProvider + ?Sized,
        Tz: TimeZone,
    {
        self.build_day(provider, date, tz).rows
    }

    /// Build the feature rows together with the day-level context used to derive them.
    ///
    /// Provider failures degrade the affected source to "no data"; this never fails.
    pub fn build_day<P, Tz>(&self, provider: &P, date: NaiveDate, tz: &Tz) -> DayFeatures
    where
        P: SampleProvider + ?Sized,
        Tz: TimeZone,
    {
        let bounds = day_bounds(date, tz);
        let bin_ms = self.bin_width.millis();

        let heart_rate = or_no_data(
            SampleSource::HeartRate,
            provider.heart_rate(bounds.start_ms, bounds.end_ms),
        );
        let sleep = or_no_data(
            SampleSource::Sleep,
            provider.last_completed_sleep_before(bounds.start_ms),
        )
        .filter(|session| is_last_night(session, &bounds))
        .map(|session| SleepContext::from_session(&session));

        let baselines = CognitiveBaselines::compute(provider, date, tz, self.baseline_window_days);
        let typing = or_no_data(
            SampleSource::Typing,
            provider.typing_results(bounds.start_ms, bounds.end_ms),
        );
        let reaction = or_no_data(
            SampleSource::Reaction,
            provider.reaction_results(bounds.start_ms, bounds.end_ms),
        );

        let bin_count = bin_count(&bounds, bin_ms);

        let mut hr_bins: Vec<Vec<f64>> = vec![Vec::new(); bin_count];
        for sample in &heart_rate {
            if let Some(idx) = bin_index(&bounds, bin_ms, sample.timestamp_ms) {
                hr_bins[idx].push(sample.bpm as f64);
            }
        }

        let mut typing_bins = vec![BinMean::default(); bin_count];
        for result in &typing {
            if let Some(idx) = bin_index(&bounds, bin_ms, result.timestamp_ms) {
                typing_bins[idx].push(result.wpm as f64);
            }
        }

        let mut reaction_bins = vec![BinMean::default(); bin_count];
        for result in &reaction {
            if let Some(idx) = bin_index(&bounds, bin_ms, result.timestamp_ms) {
                reaction_bins[idx].push(result.median_ms as f64);
            }
        }

        let sleep_context = sleep.unwrap_or_default();
        let mut rows = Vec::with_capacity(bin_count);

        for idx in 0..bin_count {
            let slot_start = bounds.start_ms + idx as i64 * bin_ms;
            let mut row = FeatureRow::empty(slot_start);

            let stats = HeartRateStats::from_values(&hr_bins[idx]);
            row.hr_mean = stats.mean;
            row.hr_std = stats.std;

            row.sleep_duration_hours = sleep_context.duration_hours;
            row.sleep_quality = sleep_context.quality;

            let (sin, cos) = circadian_encoding(fraction_of_day(slot_start, tz));
            row.sin_time_of_day = sin;
            row.cos_time_of_day = cos;

            if let Some(wpm) = typing_bins[idx].mean() {
                row.typing_wpm_delta = baselines.typing_wpm.delta(wpm, self.baseline_policy);
            }
            if let Some(ms) = reaction_bins[idx].mean() {
                row.reaction_time_delta_ms =
                    baselines.reaction_ms.delta(ms, self.baseline_policy);
            }

            rows.push(row);
        }

        debug!(
            "Built {} feature rows for {} ({} min bins, {} hr samples, sleep: {})",
            rows.len(),
            date,
            self.bin_width.minutes(),
            heart_rate.len(),
            sleep.is_some()
        );

        DayFeatures {
            date,
            day_start_ms: bounds.start_ms,
            day_end_ms: bounds.end_ms,
            bin_width_minutes: self.bin_width.minutes(),
            sleep,
            baselines,
            rows,
        }
    }
}

/// Heart-rate statistics for one bin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeartRateStats {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
}

impl HeartRateStats {
    /// Mean and population std; both 0.0 for an empty bin
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        if values.len() == 1 {
            return Self { mean, std: 0.0 };
        }
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
        }
    }
}

/// Map sleep duration to quality.
///
/// 1.0 at 7h or more, 0.7 at 6h, 0.4 at 5h, linear in between and down to 0.0 at 0h.
pub fn sleep_quality(duration_hours: f64) -> f64 {
    if !duration_hours.is_finite() || duration_hours <= 0.0 {
        return 0.0;
    }
    let quality = if duration_hours >= 7.0 {
        1.0
    } else if duration_hours >= 6.0 {
        0.7 + (duration_hours - 6.0) * 0.3
    } else if duration_hours >= 5.0 {
        0.4 + (duration_hours - 5.0) * 0.3
    } else {
        duration_hours / 5.0 * 0.4
    };
    quality.clamp(0.0, 1.0)
}

/// Sine/cosine of the fraction of day mapped onto a full turn
pub fn circadian_encoding(fraction_of_day: f64) -> (f64, f64) {
    let radians = fraction_of_day * 2.0 * PI;
    (radians.sin(), radians.cos())
}

/// Running mean of the tests falling into one bin
#[derive(Debug, Clone, Copy, Default)]
struct BinMean {
    sum: f64,
    count: usize,
}

impl BinMean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

fn is_last_night(session: &SleepSession, bounds: &DayBounds) -> bool {
    session.is_completed() && matches!(session.end_ms, Some(end) if end < bounds.start_ms)
}

/// Bins needed to cover the day. When the day length is not a multiple of the
/// bin width (30-minute DST shifts) the last bin is clipped at `day_end`; its
/// samples never extend past the day.
fn bin_count(bounds: &DayBounds, bin_ms: i64) -> usize {
    let len = bounds.len_ms().max(0);
    ((len + bin_ms - 1) / bin_ms) as usize
}

fn bin_index(bounds: &DayBounds, bin_ms: i64, timestamp_ms: i64) -> Option<usize> {
    if !bounds.contains(timestamp_ms) {
        return None;
    }
    Some(((timestamp_ms - bounds.start_ms) / bin_ms) as usize)
}
