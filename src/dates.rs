use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::traits::Clock;

/// Format used for bucket keys and RPC `date` parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used for entry timestamps sent to the backend (local, no zone).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The viewer's local calendar date.
pub fn today(clock: &dyn Clock) -> NaiveDate {
    clock.now_local().date()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Parse a local timestamp such as `2024-01-05T08:00`, `2024-01-05T08:00:00`
/// or `2024-01-05T08:00:00.123`. A trailing zone designator is ignored.
pub fn parse_local_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let s = s
        .strip_suffix('Z')
        .or_else(|| strip_offset(s))
        .unwrap_or(s);

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn strip_offset(s: &str) -> Option<&str> {
    // "+01:00" / "-05:00" after the time part
    let idx = s.len().checked_sub(6)?;
    if !s.is_char_boundary(idx) {
        return None;
    }
    let (head, tail) = s.split_at(idx);
    let bytes = tail.as_bytes();
    let is_offset = matches!(bytes.first(), Some(b'+') | Some(b'-'))
        && bytes.get(3) == Some(&b':')
        && head.contains('T');
    is_offset.then_some(head)
}

/// Format a local timestamp with seconds zeroed.
pub fn format_local_timestamp(dt: NaiveDateTime) -> String {
    let minute = dt.with_second(0).and_then(|d| d.with_nanosecond(0)).unwrap_or(dt);
    minute.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an `HH:MM` (or `HH:MM:SS`) time input.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Rebuild an entry timestamp after its time field was edited: the date comes
/// from the original timestamp, the time from the edit, seconds are zeroed.
pub fn compose_timestamp(original: &str, time: &str) -> Option<String> {
    let date = parse_local_timestamp(original)
        .map(|dt| dt.date())
        .or_else(|| original.get(..10).and_then(parse_date))?;
    let time = parse_time(time)?;
    Some(format_local_timestamp(date.and_time(time)))
}

/// Timestamp for a new entry logged on `selected` at the current local time.
pub fn entry_timestamp(selected: NaiveDate, now: NaiveDateTime) -> String {
    format_local_timestamp(selected.and_time(now.time()))
}

/// The Sunday that begins the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// The seven bucket dates (Sunday..Saturday) of the week containing `date`.
pub fn week_dates(date: NaiveDate) -> [NaiveDate; 7] {
    let start = week_start(date);
    let mut days = [start; 7];
    for (offset, day) in (0i64..).zip(days.iter_mut()) {
        *day = start + Duration::days(offset);
    }
    days
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = shift_month(year, month, 1);
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => u32::try_from((next - first).num_days()).unwrap_or(0),
        _ => 0,
    }
}

/// Move `delta` months away from `(year, month)`; month is 1-based.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month.saturating_sub(1) as i32 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

pub fn weekday_short(date: NaiveDate) -> &'static str {
    match date.weekday().num_days_from_sunday() {
        0 => "Sun",
        1 => "Mon",
        2 => "Tue",
        3 => "Wed",
        4 => "Thu",
        5 => "Fri",
        _ => "Sat",
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;
    use crate::traits::MockClock;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==================== Week Bucket Tests ====================

    #[test]
    fn test_week_start_is_sunday_for_every_weekday() {
        // 2024-01-07 is a Sunday; walk the whole week
        for offset in 0..7 {
            let input = date(2024, 1, 7) + Duration::days(offset);
            assert_eq!(week_start(input), date(2024, 1, 7), "input {}", input);
        }
    }

    #[test]
    fn test_week_dates_crosses_month_boundary() {
        let days = week_dates(date(2024, 3, 1)); // Friday
        assert_eq!(days[0], date(2024, 2, 25));
        assert_eq!(days[6], date(2024, 3, 2));
    }

    #[test]
    fn test_week_dates_crosses_year_boundary() {
        let days = week_dates(date(2025, 1, 1)); // Wednesday
        assert_eq!(days[0], date(2024, 12, 29));
        assert_eq!(days[0].weekday(), Weekday::Sun);
        assert_eq!(days[6], date(2025, 1, 4));
    }

    #[test]
    fn test_today_uses_local_clock() {
        let clock = MockClock::new(date(2024, 6, 15).and_hms_opt(23, 30, 0).unwrap());
        assert_eq!(today(&clock), date(2024, 6, 15));
    }

    // ==================== Timestamp Tests ====================

    #[test]
    fn test_parse_local_timestamp_variants() {
        let expected = date(2024, 1, 5).and_hms_opt(8, 0, 0).unwrap();
        assert_eq!(parse_local_timestamp("2024-01-05T08:00"), Some(expected));
        assert_eq!(parse_local_timestamp("2024-01-05T08:00:00"), Some(expected));
        assert_eq!(parse_local_timestamp("2024-01-05T08:00:00.000"), Some(expected));
        assert_eq!(parse_local_timestamp("2024-01-05T08:00:00+01:00"), Some(expected));
        assert_eq!(parse_local_timestamp("2024-01-05T08:00:00Z"), Some(expected));
        assert_eq!(parse_local_timestamp("not a timestamp"), None);
    }

    #[test]
    fn test_compose_timestamp_keeps_date_and_zeroes_seconds() {
        assert_eq!(
            compose_timestamp("2024-01-05T08:00:37", "13:45").as_deref(),
            Some("2024-01-05T13:45:00")
        );
        assert_eq!(
            compose_timestamp("2024-01-05T08:00", "07:05:59").as_deref(),
            Some("2024-01-05T07:05:00")
        );
    }

    #[test]
    fn test_compose_timestamp_rejects_bad_time() {
        assert_eq!(compose_timestamp("2024-01-05T08:00:00", "25:00"), None);
        assert_eq!(compose_timestamp("garbage", "10:00"), None);
    }

    #[test]
    fn test_entry_timestamp_uses_selected_date() {
        let now = date(2024, 6, 15).and_hms_opt(9, 12, 44).unwrap();
        assert_eq!(entry_timestamp(date(2024, 6, 10), now), "2024-06-10T09:12:00");
    }

    // ==================== Month Tests ====================

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    #[test]
    fn test_shift_month_wraps_years() {
        assert_eq!(shift_month(2024, 1, -1), (2023, 12));
        assert_eq!(shift_month(2024, 12, 1), (2025, 1));
        assert_eq!(shift_month(2024, 6, 0), (2024, 6));
        assert_eq!(shift_month(2024, 3, -14), (2023, 1));
    }

    #[test]
    fn test_format_and_parse_date() {
        assert_eq!(format_date(date(2024, 1, 5)), "2024-01-05");
        assert_eq!(parse_date(" 2024-01-05 "), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("2024-13-05"), None);
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn week_is_seven_increasing_days_from_sunday(days in 0i64..100_000) {
                let input = date(1900, 1, 1) + Duration::days(days);
                let week = week_dates(input);
                prop_assert_eq!(week[0].weekday(), Weekday::Sun);
                for pair in week.windows(2) {
                    prop_assert_eq!(pair[1] - pair[0], Duration::days(1));
                }
                prop_assert!(week.contains(&input));
            }

            #[test]
            fn shift_month_round_trips(year in 1900i32..2200, month in 1u32..=12, delta in -240i32..240) {
                let (y, m) = shift_month(year, month, delta);
                prop_assert!((1..=12).contains(&m));
                prop_assert_eq!(shift_month(y, m, -delta), (year, month));
            }
        }
    }
}
