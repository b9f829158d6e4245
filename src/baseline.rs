//! Baseline management
//!
//! Rolling personal baselines for the cognitive tests (typing speed and
//! reaction time). Each day's deltas are measured against the average of the
//! tests taken in the preceding window, which excludes the day itself.

use crate::calendar::local_day_start_ms;
use crate::config::BaselinePolicy;
use crate::provider::{or_no_data, SampleProvider};
use crate::types::SampleSource;
use chrono::{Days, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Rolling average of a single cognitive metric
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CognitiveBaseline {
    /// Window mean, `None` when the window holds no tests
    pub mean: Option<f64>,
    /// Number of tests in the window
    pub sample_count: usize,
}

impl CognitiveBaseline {
    /// Build a baseline from the values observed in the window
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

        Self {
            mean: rolling_average(sum, count),
            sample_count: count,
        }
    }

    pub fn has_history(&self) -> bool {
        self.mean.is_some()
    }

    /// Delta of an observation against this baseline.
    ///
    /// Without history, `ZeroFill` treats the baseline as 0.0 (the delta is the
    /// raw observation) and `RequireHistory` reports no change.
    pub fn delta(&self, observed: f64, policy: BaselinePolicy) -> f64 {
        match (self.mean, policy) {
            (Some(mean), _) => observed - mean,
            (None, BaselinePolicy::ZeroFill) => observed,
            (None, BaselinePolicy::RequireHistory) => 0.0,
        }
    }
}

/// Typing and reaction baselines for one day
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CognitiveBaselines {
    /// Words per minute
    pub typing_wpm: CognitiveBaseline,
    /// Median reaction time in milliseconds
    pub reaction_ms: CognitiveBaseline,
    /// Window start in epoch milliseconds (inclusive)
    pub window_start_ms: i64,
    /// Window end in epoch milliseconds (exclusive, the day's start)
    pub window_end_ms: i64,
}

impl CognitiveBaselines {
    /// Compute baselines over the `window_days` local days preceding `date`.
    ///
    /// A failing source yields an empty baseline for that source only.
    pub fn compute<P, Tz>(provider: &P, date: NaiveDate, tz: &Tz, window_days: u32) -> Self
    where
        P: SampleProvider + ?Sized,
        Tz: TimeZone,
    {
        let window_end_ms = local_day_start_ms(date, tz);
        let window_start_ms = date
            .checked_sub_days(Days::new(window_days as u64))
            .map(|start| local_day_start_ms(start, tz))
            .unwrap_or(i64::MIN);

        let typing = or_no_data(
            SampleSource::Typing,
            provider.typing_results(window_start_ms, window_end_ms),
        );
        let reaction = or_no_data(
            SampleSource::Reaction,
            provider.reaction_results(window_start_ms, window_end_ms),
        );

        Self {
            typing_wpm: CognitiveBaseline::from_values(typing.iter().map(|t| t.wpm as f64)),
            reaction_ms: CognitiveBaseline::from_values(
                reaction.iter().map(|r| r.median_ms as f64),
            ),
            window_start_ms,
            window_end_ms,
        }
    }
}

fn rolling_average(sum: f64, count: usize) -> Option<f64> {
    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}
