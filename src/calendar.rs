//! Local day boundaries and wall-clock helpers
//!
//! The timezone is always an explicit argument. Anything implementing
//! `chrono::TimeZone` works; hosts without a tz database pass a `FixedOffset`
//! parsed with [`parse_utc_offset`].

use crate::error::ComputeError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use log::warn;

/// Milliseconds in a 24-hour day
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Step used when local midnight falls inside a DST gap
const GAP_SEARCH_STEP_MINUTES: i64 = 15;
/// Longest DST gap searched (3 hours)
const GAP_SEARCH_STEPS: i64 = 12;

/// Half-open `[start_ms, end_ms)` interval of a local calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DayBounds {
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && timestamp_ms < self.end_ms
    }

    pub fn len_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Compute the local day boundaries of `date` in `tz`.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DayBounds {
    let start_ms = local_day_start_ms(date, tz);
    let end_ms = match date.succ_opt() {
        Some(next) => local_day_start_ms(next, tz),
        None => start_ms + MILLIS_PER_DAY,
    };
    DayBounds { start_ms, end_ms }
}

/// Epoch milliseconds of the first existing local instant of `date`.
///
/// Normally local midnight. When midnight is skipped by a DST transition the
/// first instant after the gap is used.
pub fn local_day_start_ms<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);

    for step in 0..=GAP_SEARCH_STEPS {
        let candidate = midnight + Duration::minutes(step * GAP_SEARCH_STEP_MINUTES);
        if let Some(local) = tz.from_local_datetime(&candidate).earliest() {
            return local.timestamp_millis();
        }
    }

    warn!("No valid local midnight for {date}, falling back to UTC midnight");
    midnight.and_utc().timestamp_millis()
}

/// Local wall-clock position of `timestamp_ms` as a fraction of the day.
///
/// Minute resolution: `(hour * 60 + minute) / 1440`, in `[0, 1)`.
pub fn fraction_of_day<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> f64 {
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(utc) => {
            let local = utc.with_timezone(tz);
            (local.hour() * 60 + local.minute()) as f64 / (24.0 * 60.0)
        }
        None => 0.0,
    }
}

/// Parse a timezone given as `UTC`, `Z`, or a `±HH:MM` / `±HHMM` offset.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ComputeError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| ComputeError::InvalidTimezone(value.to_string()));
    }

    let invalid = || ComputeError::InvalidTimezone(value.to_string());

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 18 || minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parse an ISO `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, ComputeError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("{value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::America::Santiago;
    use chrono_tz::Europe::Berlin;

    #[test]
    fn test_utc_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let bounds = day_bounds(date, &Utc);
        assert_eq!(bounds.start_ms, 1_705_276_800_000);
        assert_eq!(bounds.len_ms(), MILLIS_PER_DAY);
        assert!(bounds.contains(bounds.start_ms));
        assert!(!bounds.contains(bounds.end_ms));
    }

    #[test]
    fn test_offset_shifts_day_start() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let utc = day_bounds(date, &Utc);
        let plus_two = day_bounds(date, &FixedOffset::east_opt(2 * 3600).unwrap());
        // Local midnight at +02:00 is two hours earlier in UTC
        assert_eq!(utc.start_ms - plus_two.start_ms, 2 * 3_600_000);
        assert_eq!(plus_two.len_ms(), MILLIS_PER_DAY);
    }

    #[test]
    fn test_fraction_of_day_is_local() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let start = local_day_start_ms(date, &tz);
        assert_eq!(fraction_of_day(start, &tz), 0.0);
        assert!((fraction_of_day(start + 12 * 3_600_000, &tz) - 0.5).abs() < 1e-12);
        assert!((fraction_of_day(start + 90 * 60_000, &tz) - 90.0 / 1440.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_utc_offset("-0800").unwrap().local_minus_utc(), -28_800);
    }

    #[test]
    fn test_parse_utc_offset_rejects_garbage() {
        for bad in ["America/New_York", "+5", "+25:00", "+05:75", ""] {
            assert!(
                matches!(parse_utc_offset(bad), Err(ComputeError::InvalidTimezone(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(matches!(
            parse_date("15/01/2024"),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_dst_day_lengths() {
        let spring = day_bounds(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(), &Berlin);
        assert_eq!(spring.start_ms, 1_711_839_600_000);
        assert_eq!(spring.len_ms(), 23 * 3_600_000);

        let fall = day_bounds(NaiveDate::from_ymd_opt(2024, 10, 27).unwrap(), &Berlin);
        assert_eq!(fall.start_ms, 1_729_980_000_000);
        assert_eq!(fall.len_ms(), 25 * 3_600_000);
    }

    #[test]
    fn test_midnight_in_dst_gap() {
        // 2024-09-08 00:00 does not exist in Santiago; the day opens at 01:00 (-03:00)
        let date = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();
        let bounds = day_bounds(date, &Santiago);
        assert_eq!(bounds.start_ms, 1_725_768_000_000);
        assert_eq!(bounds.len_ms(), 23 * 3_600_000);
        assert!((fraction_of_day(bounds.start_ms, &Santiago) - 1.0 / 24.0).abs() < 1e-12);

        // The day before ends exactly where the gap day begins
        let previous = day_bounds(date.pred_opt().unwrap(), &Santiago);
        assert_eq!(previous.end_ms, bounds.start_ms);
        assert_eq!(previous.len_ms(), MILLIS_PER_DAY);
    }
}
