//! Business-timezone calendar helpers.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

pub fn business_day(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Start of `day` in `tz`, as UTC.
pub fn day_start_utc(tz: Tz, day: NaiveDate) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("no local midnight for {day} in {tz}"))
}

/// `[start, end)` of `day` in `tz`, as UTC.
pub fn day_bounds_utc(tz: Tz, day: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let next = day
        .succ_opt()
        .ok_or_else(|| anyhow!("calendar overflow after {day}"))?;
    Ok((day_start_utc(tz, day)?, day_start_utc(tz, next)?))
}

/// The previous business day as a UTC window.
pub fn previous_day_window(tz: Tz, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let today = business_day(tz, now);
    let yesterday = today
        .pred_opt()
        .ok_or_else(|| anyhow!("calendar underflow before {today}"))?;
    day_bounds_utc(tz, yesterday)
}

/// Rolling window `[now - lookback, now)`.
pub fn lookback_window(
    now: DateTime<Utc>,
    lookback_minutes: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if lookback_minutes <= 0 {
        bail!("lookback must be > 0 minutes, got {lookback_minutes}");
    }
    let start = Duration::try_minutes(lookback_minutes)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| anyhow!("lookback of {lookback_minutes} minutes is out of range"))?;
    Ok((start, now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seoul_day_starts_at_15_utc_previous_day() {
        let tz: Tz = "Asia/Seoul".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let (start, end) = day_bounds_utc(tz, day).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 17, 15, 0, 0).unwrap());
        assert_eq!(end - start, Duration::hours(24));
    }

    #[test]
    fn business_day_follows_timezone() {
        let tz: Tz = "Asia/Seoul".parse().unwrap();
        // 16:00 UTC is already the next day in Seoul.
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 16, 0, 0).unwrap();
        assert_eq!(business_day(tz, now), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(business_day(chrono_tz::UTC, now), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[test]
    fn previous_day_window_covers_yesterday() {
        let tz = chrono_tz::UTC;
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 5).unwrap();
        let (s, e) = previous_day_window(tz, now).unwrap();
        assert_eq!(s, Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap());
        assert_eq!(e, Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap());
    }

    #[test]
    fn lookback_is_half_open_ending_now() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 15, 0).unwrap();
        let (s, e) = lookback_window(now, 15).unwrap();
        assert_eq!(s, Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap());
        assert_eq!(e, now);
    }

    #[test]
    fn lookback_out_of_range_is_an_error() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 15, 0).unwrap();
        assert!(lookback_window(now, i64::MAX).is_err());
        assert!(lookback_window(now, 0).is_err());
    }
}
