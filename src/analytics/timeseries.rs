use crate::analytics::periods::DATE_FORMAT;
use crate::model::VisitEvent;
use chrono::{DateTime, Days, FixedOffset, Locale, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of daily buckets in the dashboard trend.
pub const TREND_DAYS: usize = 14;

/// One calendar day of the trend chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    /// `YYYY-MM-DD`, comparable with `VisitEvent::date`.
    pub date: String,
    /// Short month name and day of month in the viewer's locale, e.g. "Jan 5".
    pub label: String,
    pub visitors: u64,
    pub destinations: u64,
}

/// Daily visitor and destination-view counts for the `days` calendar days
/// ending at `now`'s local day, oldest first.
///
/// Bucketing uses the stored `date` string. Days without events still get a
/// bucket with zero counts.
pub fn daily_series(
    events: &[VisitEvent],
    now: DateTime<FixedOffset>,
    locale: Locale,
    days: usize,
) -> Vec<DayBucket> {
    let mut per_day: HashMap<&str, (u64, u64)> = HashMap::new();
    for event in events {
        let slot = per_day.entry(event.date.as_str()).or_default();
        slot.0 += 1;
        if event.destination.is_some() {
            slot.1 += 1;
        }
    }

    let today = now.date_naive();
    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back as u64)))
        .map(|day| {
            let date = day.format(DATE_FORMAT).to_string();
            let (visitors, destinations) = per_day.get(date.as_str()).copied().unwrap_or_default();
            DayBucket {
                label: day_label(day, locale),
                date,
                visitors,
                destinations,
            }
        })
        .collect()
}

/// Short month + day label for a calendar day.
pub fn day_label(day: NaiveDate, locale: Locale) -> String {
    // Midnight UTC on `day`, only used to drive the localized formatter.
    let instant = DateTime::<Utc>::from_naive_utc_and_offset(day.and_time(NaiveTime::MIN), Utc);
    instant.format_localized("%b %-d", locale).to_string()
}
