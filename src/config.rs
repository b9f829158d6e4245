//! Engine configuration
//!
//! Configuration is an explicit value passed by the host into the processor;
//! the engine keeps no global state.

use crate::error::ComputeError;
use log::warn;
use serde::{Deserialize, Serialize};

/// Default rolling baseline window for cognitive tests, in days
pub const DEFAULT_BASELINE_WINDOW_DAYS: u32 = 7;

/// Supported bin widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinWidth {
    ThirtyMinutes,
    #[default]
    SixtyMinutes,
}

impl BinWidth {
    /// Resolve a configured width in minutes.
    ///
    /// Anything other than 30 or 60 falls back to the 60-minute default.
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            30 => BinWidth::ThirtyMinutes,
            60 => BinWidth::SixtyMinutes,
            other => {
                let fallback = BinWidth::default();
                warn!(
                    "Unsupported bin width {} minutes, using default {} minutes",
                    other,
                    fallback.minutes()
                );
                fallback
            }
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            BinWidth::ThirtyMinutes => 30,
            BinWidth::SixtyMinutes => 60,
        }
    }

    pub fn millis(&self) -> i64 {
        self.minutes() as i64 * 60_000
    }

    /// Number of bins in a 24-hour day
    pub fn bins_per_day(&self) -> usize {
        (24 * 60 / self.minutes()) as usize
    }
}

/// How cognitive deltas are computed when the baseline window holds no tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Missing baseline counts as 0.0, so the delta equals the observed value
    #[default]
    ZeroFill,
    /// Missing baseline yields a 0.0 delta until history exists
    RequireHistory,
}

/// Configuration for the feature builder and processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bin width in minutes (30 or 60)
    pub bin_width_minutes: u32,
    /// Length of the rolling typing/reaction baseline window in days
    pub baseline_window_days: u32,
    /// Delta behaviour for users without test history
    pub baseline_policy: BaselinePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bin_width_minutes: BinWidth::default().minutes(),
            baseline_window_days: DEFAULT_BASELINE_WINDOW_DAYS,
            baseline_policy: BaselinePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_bin_width(mut self, minutes: u32) -> Self {
        self.bin_width_minutes = minutes;
        self
    }

    pub fn with_baseline_window(mut self, days: u32) -> Self {
        self.baseline_window_days = days;
        self
    }

    pub fn with_baseline_policy(mut self, policy: BaselinePolicy) -> Self {
        self.baseline_policy = policy;
        self
    }

    /// Effective bin width after fallback
    pub fn bin_width(&self) -> BinWidth {
        BinWidth::from_minutes(self.bin_width_minutes)
    }

    /// Effective baseline window; zero days is widened to the default
    pub fn baseline_window(&self) -> u32 {
        if self.baseline_window_days == 0 {
            warn!(
                "Baseline window of 0 days, using default {} days",
                DEFAULT_BASELINE_WINDOW_DAYS
            );
            DEFAULT_BASELINE_WINDOW_DAYS
        } else {
            self.baseline_window_days
        }
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        serde_json::from_str(json).map_err(|e| ComputeError::InvalidConfig(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }
}
