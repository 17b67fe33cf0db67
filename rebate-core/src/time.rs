//! Time utilities: the calendar date a transaction falls on.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{EngineError, EngineResult};

pub fn parse_timezone(tz: &str) -> EngineResult<Tz> {
    tz.parse()
        .map_err(|_| EngineError::InvalidTimezone(tz.to_string()))
}

/// Local calendar date of `now` in an IANA tz like "Asia/Hong_Kong".
pub fn date_in(now: DateTime<Utc>, tz: &str) -> EngineResult<NaiveDate> {
    let tz = parse_timezone(tz)?;
    Ok(now.with_timezone(&tz).date_naive())
}

pub fn today_in(tz: &str) -> EngineResult<NaiveDate> {
    date_in(Utc::now(), tz)
}

/// Parse a "2026-10-18" style date.
pub fn parse_date(s: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hong_kong_date_rolls_over_before_utc() {
        // 17:30 UTC is 01:30 the next day in HKT (UTC+8)
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 17, 30, 0).unwrap();
        assert_eq!(
            date_in(now, "Asia/Hong_Kong").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );
        assert_eq!(
            date_in(now, "UTC").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );
    }

    #[test]
    fn test_invalid_timezone() {
        assert_eq!(
            today_in("Mars/Olympus"),
            Err(EngineError::InvalidTimezone("Mars/Olympus".into()))
        );
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2026-02-28 ").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert!(matches!(parse_date("28/02/2026"), Err(EngineError::InvalidDate(_))));
    }
}
