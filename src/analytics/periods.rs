use crate::model::VisitEvent;
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Format of the recorder-side `date` string.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Visit counts for the summary cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCounts {
    pub total: u64,
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
}

/// Count visits for today, this week, this month and the whole window.
///
/// `today` matches the stored `date` string against `now`'s local date.
/// Week and month use `timestamp`, with the week starting on Sunday 00:00
/// local time. Events without a timestamp only contribute to `total`.
pub fn count_periods(events: &[VisitEvent], now: DateTime<FixedOffset>) -> PeriodCounts {
    let today = now.date_naive();
    let today_str = today.format(DATE_FORMAT).to_string();
    let week_start = local_midnight(start_of_week(today), *now.offset());
    let month_start = local_midnight(today.with_day(1).unwrap_or(today), *now.offset());

    let mut counts = PeriodCounts {
        total: events.len() as u64,
        ..PeriodCounts::default()
    };
    for event in events {
        if event.date == today_str {
            counts.today += 1;
        }
        if let Some(ts) = event.timestamp {
            if ts >= week_start {
                counts.this_week += 1;
            }
            if ts >= month_start {
                counts.this_month += 1;
            }
        }
    }
    counts
}

/// Sunday on or before `day`.
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    let back = u64::from(day.weekday().num_days_from_sunday());
    day.checked_sub_days(Days::new(back)).unwrap_or(day)
}

/// The UTC instant of 00:00 on `day` in the given offset.
pub fn local_midnight(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = day.and_time(NaiveTime::MIN);
    let utc = local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ict() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    // Wednesday 2024-01-17 15:00 in UTC+7.
    fn now() -> DateTime<FixedOffset> {
        ict().with_ymd_and_hms(2024, 1, 17, 15, 0, 0).unwrap()
    }

    fn event_at(date: &str, ts: Option<DateTime<FixedOffset>>) -> VisitEvent {
        let mut e = VisitEvent::new("v", date, "/");
        e.timestamp = ts.map(|t| t.with_timezone(&Utc));
        e
    }

    #[test]
    fn test_empty_is_all_zero() {
        assert_eq!(count_periods(&[], now()), PeriodCounts::default());
    }

    #[test]
    fn test_start_of_week_is_sunday() {
        let wed = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        assert_eq!(start_of_week(wed), NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        let sun = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(start_of_week(sun), sun);
    }

    #[test]
    fn test_local_midnight_applies_offset() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(
            local_midnight(day, ict()),
            Utc.with_ymd_and_hms(2024, 1, 13, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_counts_by_period() {
        let events = vec![
            // today
            event_at("2024-01-17", Some(ict().with_ymd_and_hms(2024, 1, 17, 9, 0, 0).unwrap())),
            // Sunday just after local midnight: this week
            event_at("2024-01-14", Some(ict().with_ymd_and_hms(2024, 1, 14, 0, 30, 0).unwrap())),
            // Saturday before: this month only
            event_at("2024-01-13", Some(ict().with_ymd_and_hms(2024, 1, 13, 23, 0, 0).unwrap())),
            // last month
            event_at("2023-12-31", Some(ict().with_ymd_and_hms(2023, 12, 31, 12, 0, 0).unwrap())),
        ];
        let counts = count_periods(&events, now());
        assert_eq!(
            counts,
            PeriodCounts {
                total: 4,
                today: 1,
                this_week: 2,
                this_month: 3,
            }
        );
    }

    #[test]
    fn test_missing_timestamp_counts_in_total_only() {
        let events = vec![event_at("2023-01-01", None)];
        let counts = count_periods(&events, now());
        assert_eq!(counts.total, 1);
        assert_eq!(counts.this_week, 0);
        assert_eq!(counts.this_month, 0);
    }

    #[test]
    fn test_today_uses_date_string_not_timestamp() {
        // Stored date says today, timestamp says last month: the two
        // sources are allowed to disagree.
        let events = vec![event_at(
            "2024-01-17",
            Some(ict().with_ymd_and_hms(2023, 12, 1, 12, 0, 0).unwrap()),
        )];
        let counts = count_periods(&events, now());
        assert_eq!(counts.today, 1);
        assert_eq!(counts.this_month, 0);
    }
}
