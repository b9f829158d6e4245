//! energy.raw_sample.v1 input schema
//!
//! Hosts without their own [`SampleProvider`](crate::provider::SampleProvider)
//! hand raw samples over as JSON arrays or NDJSON streams of these records.

mod adapter;
mod raw_sample;

pub use adapter::*;
pub use raw_sample::*;
