//! Raw sample providers
//!
//! The host owns persistence. The engine reads raw samples through the
//! [`SampleProvider`] trait; every range query is half-open `[start_ms, end_ms)`
//! and an empty result is a valid answer, not an error.

use crate::error::ProviderError;
use crate::types::{HeartRateSample, ReactionResult, SampleSource, SleepSession, TypingResult};
use log::warn;

/// Read-only access to the host's raw sample store
pub trait SampleProvider {
    /// Heart-rate samples with `timestamp_ms` in range
    fn heart_rate(&self, start_ms: i64, end_ms: i64)
        -> Result<Vec<HeartRateSample>, ProviderError>;

    /// Sleep sessions with `start_ms` in range
    fn sleep_sessions(&self, start_ms: i64, end_ms: i64)
        -> Result<Vec<SleepSession>, ProviderError>;

    /// The completed session with the latest end strictly before `before_ms`
    fn last_completed_sleep_before(
        &self,
        before_ms: i64,
    ) -> Result<Option<SleepSession>, ProviderError>;

    /// Typing tests with `timestamp_ms` in range
    fn typing_results(&self, start_ms: i64, end_ms: i64)
        -> Result<Vec<TypingResult>, ProviderError>;

    /// Reaction tests with `timestamp_ms` in range
    fn reaction_results(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ReactionResult>, ProviderError>;
}

impl<P: SampleProvider + ?Sized> SampleProvider for &P {
    fn heart_rate(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<HeartRateSample>, ProviderError> {
        (**self).heart_rate(start_ms, end_ms)
    }

    fn sleep_sessions(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<SleepSession>, ProviderError> {
        (**self).sleep_sessions(start_ms, end_ms)
    }

    fn last_completed_sleep_before(
        &self,
        before_ms: i64,
    ) -> Result<Option<SleepSession>, ProviderError> {
        (**self).last_completed_sleep_before(before_ms)
    }

    fn typing_results(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<TypingResult>, ProviderError> {
        (**self).typing_results(start_ms, end_ms)
    }

    fn reaction_results(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ReactionResult>, ProviderError> {
        (**self).reaction_results(start_ms, end_ms)
    }
}

/// Degrade a failed query to "no data for this source".
pub(crate) fn or_no_data<T: Default>(source: SampleSource, result: Result<T, ProviderError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Treating {} as empty after provider error: {}", source.as_str(), e);
            T::default()
        }
    }
}

/// In-memory sample store, kept sorted by timestamp.
///
/// Used by the CLI, the FFI layer and tests. Hosts with a real database
/// implement [`SampleProvider`] directly.
#[derive(Debug, Clone, Default)]
pub struct MemorySampleStore {
    heart_rate: Vec<HeartRateSample>,
    sleep: Vec<SleepSession>,
    typing: Vec<TypingResult>,
    reaction: Vec<ReactionResult>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_heart_rate(&mut self, sample: HeartRateSample) {
        let idx = self
            .heart_rate
            .partition_point(|s| s.timestamp_ms <= sample.timestamp_ms);
        self.heart_rate.insert(idx, sample);
    }

    pub fn insert_sleep(&mut self, session: SleepSession) {
        let idx = self.sleep.partition_point(|s| s.start_ms <= session.start_ms);
        self.sleep.insert(idx, session);
    }

    pub fn insert_typing(&mut self, result: TypingResult) {
        let idx = self
            .typing
            .partition_point(|s| s.timestamp_ms <= result.timestamp_ms);
        self.typing.insert(idx, result);
    }

    pub fn insert_reaction(&mut self, result: ReactionResult) {
        let idx = self
            .reaction
            .partition_point(|s| s.timestamp_ms <= result.timestamp_ms);
        self.reaction.insert(idx, result);
    }

    pub fn with_heart_rate(mut self, samples: impl IntoIterator<Item = HeartRateSample>) -> Self {
        for sample in samples {
            self.insert_heart_rate(sample);
        }
        self
    }

    pub fn with_sleep(mut self, sessions: impl IntoIterator<Item = SleepSession>) -> Self {
        for session in sessions {
            self.insert_sleep(session);
        }
        self
    }

    pub fn with_typing(mut self, results: impl IntoIterator<Item = TypingResult>) -> Self {
        for result in results {
            self.insert_typing(result);
        }
        self
    }

    pub fn with_reaction(mut self, results: impl IntoIterator<Item = ReactionResult>) -> Self {
        for result in results {
            self.insert_reaction(result);
        }
        self
    }

    /// Total number of stored samples across all sources
    pub fn len(&self) -> usize {
        self.heart_rate.len() + self.sleep.len() + self.typing.len() + self.reaction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Slice of `items` whose key falls in `[start, end)`; `items` must be sorted by key.
fn sorted_range<T: Clone>(items: &[T], start: i64, end: i64, key: impl Fn(&T) -> i64) -> Vec<T> {
    if end <= start {
        return Vec::new();
    }
    let lo = items.partition_point(|item| key(item) < start);
    let hi = items.partition_point(|item| key(item) < end);
    items[lo..hi].to_vec()
}

impl SampleProvider for MemorySampleStore {
    fn heart_rate(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<HeartRateSample>, ProviderError> {
        Ok(sorted_range(&self.heart_rate, start_ms, end_ms, |s| {
            s.timestamp_ms
        }))
    }

    fn sleep_sessions(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<SleepSession>, ProviderError> {
        Ok(sorted_range(&self.sleep, start_ms, end_ms, |s| s.start_ms))
    }

    fn last_completed_sleep_before(
        &self,
        before_ms: i64,
    ) -> Result<Option<SleepSession>, ProviderError> {
        // Ties on end time resolve to the later-starting session
        Ok(self
            .sleep
            .iter()
            .filter(|s| s.is_completed())
            .filter(|s| matches!(s.end_ms, Some(end) if end < before_ms))
            .max_by_key(|s| s.end_ms)
            .cloned())
    }

    fn typing_results(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<TypingResult>, ProviderError> {
        Ok(sorted_range(&self.typing, start_ms, end_ms, |s| s.timestamp_ms))
    }

    fn reaction_results(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ReactionResult>, ProviderError> {
        Ok(sorted_range(&self.reaction, start_ms, end_ms, |s| {
            s.timestamp_ms
        }))
    }
}
