//! Synheart Energy - On-device energy level inference
//!
//! Energy turns raw personal signals (heart rate, sleep sessions, typing and
//! reaction tests) into a per-slot energy estimate through a deterministic
//! pipeline: raw samples → fixed-width feature bins → personal baselines →
//! scored, classified predictions.
//!
//! ## Modules
//!
//! - **Features**: Bin a local day's raw samples into ordered feature rows
//! - **Scorer**: Score each row and classify it as LOW, MEDIUM or HIGH
//! - **Pipeline**: Run both stages and encode `energy.forecast.v1` payloads
//!
//! Hosts read samples through [`SampleProvider`] or hand them over as
//! `energy.raw_sample.v1` records.

pub mod baseline;
pub mod calendar;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod provider;
pub mod schema;
pub mod scorer;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{BaselinePolicy, BinWidth, EngineConfig};
pub use error::{ComputeError, ProviderError};
pub use features::BinFeatureBuilder;
pub use pipeline::{samples_to_features_json, samples_to_forecast_json, DayForecast, EnergyProcessor};
pub use provider::{MemorySampleStore, SampleProvider};
pub use scorer::EnergyScorer;
pub use types::{EnergyLevel, FeatureRow, Prediction};

// Schema exports
pub use schema::{RawSample, RawSampleAdapter, SCHEMA_VERSION};

/// Engine version embedded in all forecast payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for forecast payloads
pub const PRODUCER_NAME: &str = "synheart-energy";
