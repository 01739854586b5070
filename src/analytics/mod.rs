//! Dashboard statistics derived from the visit log.
//!
//! Everything here is a pure function of the aggregation window and an
//! explicit [`AggregationContext`]; nothing reads the wall clock or a
//! process-wide locale.

pub mod device;
pub mod periods;
pub mod ranking;
pub mod timeseries;
pub mod window;

use crate::model::VisitEvent;
use chrono::{DateTime, FixedOffset, Locale};
use serde::{Deserialize, Serialize};

pub use device::Device;
pub use periods::PeriodCounts;
pub use ranking::{RankedEntry, Ranking};
pub use timeseries::DayBucket;
pub use window::AggregationWindow;

/// Reference instant and display locale for one aggregation run.
#[derive(Debug, Clone, Copy)]
pub struct AggregationContext {
    /// "Now", carrying the viewer's UTC offset.
    pub now: DateTime<FixedOffset>,
    pub locale: Locale,
}

impl AggregationContext {
    pub const fn new(now: DateTime<FixedOffset>, locale: Locale) -> Self {
        Self { now, locale }
    }
}

/// Everything the reporting surface shows, derived from one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: PeriodCounts,
    pub destination_ranking: Ranking,
    pub country_ranking: Ranking,
    #[serde(rename = "series14Day")]
    pub series: Vec<DayBucket>,
}

impl DashboardStats {
    /// Copy with both rankings cut to their top `n` entries.
    pub fn truncated(&self, n: usize) -> Self {
        Self {
            counts: self.counts,
            destination_ranking: self.destination_ranking.top(n),
            country_ranking: self.country_ranking.top(n),
            series: self.series.clone(),
        }
    }
}

/// Derive the dashboard statistics for a window.
///
/// Never fails: an empty window gives zero counts, empty rankings and a
/// 14-day series of zero buckets.
pub fn aggregate(window: &AggregationWindow, ctx: &AggregationContext) -> DashboardStats {
    let events = window.events();
    DashboardStats {
        counts: periods::count_periods(events, ctx.now),
        destination_ranking: ranking::rank_destinations(events),
        country_ranking: ranking::rank_countries(events),
        series: timeseries::daily_series(events, ctx.now, ctx.locale, timeseries::TREND_DAYS),
    }
}

/// One row of the raw visit table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRow {
    pub visit_id: String,
    pub date: String,
    /// Local time of day of `timestamp`, empty when the event has none.
    pub time: String,
    pub page: String,
    pub destination: String,
    pub country: String,
    pub city: String,
    pub device: Device,
    pub language: String,
    pub screen_resolution: String,
}

impl VisitRow {
    pub fn from_event(event: &VisitEvent, offset: FixedOffset) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            visit_id: event.visit_id.clone(),
            date: event.date.clone(),
            time: event
                .timestamp
                .map(|t| t.with_timezone(&offset).format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            page: event.display_name().to_string(),
            destination: text(&event.destination),
            country: text(&event.country),
            city: text(&event.city),
            device: Device::classify(event.user_agent.as_deref()),
            language: text(&event.language),
            screen_resolution: text(&event.screen_resolution),
        }
    }
}

/// Raw table rows for every event in the window, newest first.
pub fn visit_rows(window: &AggregationWindow, offset: FixedOffset) -> Vec<VisitRow> {
    window
        .events()
        .iter()
        .map(|e| VisitRow::from_event(e, offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn ict() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn ctx() -> AggregationContext {
        AggregationContext::new(
            ict().with_ymd_and_hms(2024, 1, 17, 15, 0, 0).unwrap(),
            Locale::en_US,
        )
    }

    fn visit_at(local: DateTime<FixedOffset>) -> VisitEvent {
        let mut e = VisitEvent::new(
            format!("v{}", local.timestamp()),
            local.format("%Y-%m-%d").to_string(),
            "/tours",
        );
        e.timestamp = Some(local.with_timezone(&Utc));
        e
    }

    fn three_event_fixture() -> AggregationWindow {
        let now = ctx().now;
        let mut a = visit_at(now - Duration::hours(1));
        a.destination = Some("VANG VIENG".to_string());
        a.destination_type = Some("city".to_string());
        let mut b = visit_at(now - Duration::hours(2));
        b.page = "/".to_string();
        let mut c = visit_at(now - Duration::days(10));
        c.destination = Some("VANG VIENG".to_string());
        AggregationWindow::new(vec![a, b, c], 200)
    }

    #[test]
    fn test_three_event_example() {
        let stats = aggregate(&three_event_fixture(), &ctx());
        assert_eq!(stats.counts.total, 3);
        assert_eq!(stats.counts.today, 2);

        let ranking = stats.destination_ranking.entries();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].label, "VANG VIENG");
        assert_eq!(ranking[0].count, 2);
        assert!((ranking[0].percentage - 66.7).abs() < 1e-9);
        assert_eq!(ranking[1].label, "Home Page");
        assert_eq!(ranking[1].count, 1);
        assert!((ranking[1].percentage - 33.3).abs() < 1e-9);

        assert_eq!(stats.series.len(), 14);
        assert_eq!(stats.series[13].visitors, 2);
        assert_eq!(stats.series[13].destinations, 1);
        assert_eq!(stats.series[3].destinations, 1);
    }

    #[test]
    fn test_empty_window() {
        let stats = aggregate(&AggregationWindow::new(Vec::new(), 200), &ctx());
        assert_eq!(stats.counts, PeriodCounts::default());
        assert!(stats.destination_ranking.is_empty());
        assert!(stats.country_ranking.is_empty());
        assert_eq!(stats.series.len(), 14);
        assert!(stats.series.iter().all(|b| b.visitors == 0));
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let window = three_event_fixture();
        let first = aggregate(&window, &ctx());
        let second = aggregate(&window, &ctx());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_window_cap_scopes_totals() {
        let now = ctx().now;
        let events: Vec<_> = (0..10).map(|i| visit_at(now - Duration::minutes(i))).collect();
        let stats = aggregate(&AggregationWindow::new(events, 4), &ctx());
        assert_eq!(stats.counts.total, 4);
        assert_eq!(stats.counts.today, 4);
    }

    #[test]
    fn test_json_shape() {
        let stats = aggregate(&three_event_fixture(), &ctx());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["today"], 2);
        assert!(json.get("thisWeek").is_some());
        assert!(json.get("thisMonth").is_some());
        assert!(json["destinationRanking"].is_array());
        assert!(json["countryRanking"].is_array());
        assert_eq!(json["series14Day"].as_array().unwrap().len(), 14);
    }

    #[test]
    fn test_truncated_keeps_counts() {
        let stats = aggregate(&three_event_fixture(), &ctx());
        let top = stats.truncated(1);
        assert_eq!(top.counts, stats.counts);
        assert_eq!(top.destination_ranking.len(), 1);
    }

    #[test]
    fn test_visit_rows() {
        let mut event = visit_at(ict().with_ymd_and_hms(2024, 1, 17, 9, 5, 30).unwrap());
        event.user_agent = Some("Mozilla/5.0 (Linux; Android 14) Mobile Safari".to_string());
        event.country = Some("Laos".to_string());
        let window = AggregationWindow::new(vec![event, VisitEvent::new("x", "2024-01-01", "/")], 10);
        let rows = visit_rows(&window, ict());
        assert_eq!(rows[0].time, "09:05:30");
        assert_eq!(rows[0].device, Device::Mobile);
        assert_eq!(rows[0].country, "Laos");
        assert_eq!(rows[1].time, "");
        assert_eq!(rows[1].device, Device::Desktop);
    }
}
