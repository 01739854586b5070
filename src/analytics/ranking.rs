use crate::model::VisitEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bucket key for homepage views in the destination ranking.
pub const HOMEPAGE_KEY: &str = "HOMEPAGE";
/// Display label of the homepage bucket.
pub const HOMEPAGE_LABEL: &str = "Home Page";
/// Country value that geolocation writes when the lookup failed.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// One entry of a destination or country ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub key: String,
    pub label: String,
    pub count: u64,
    /// Share of the whole window, 0-100, rounded to one decimal.
    pub percentage: f64,
}

/// Counts per key, descending by count.
///
/// Ties keep the order in which keys were first seen in the window
/// (newest event first), via a stable sort over insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking(Vec<RankedEntry>);

impl Ranking {
    pub fn entries(&self) -> &[RankedEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The first `n` entries, for the ranked list views.
    pub fn top(&self, n: usize) -> Self {
        Self(self.0.iter().take(n).cloned().collect())
    }
}

/// Insertion-ordered tally used to build a [`Ranking`].
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, String, u64)>,
}

impl Tally {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: &str, label: impl FnOnce() -> String) {
        if let Some(&i) = self.index.get(key) {
            self.entries[i].2 += 1;
        } else {
            self.index.insert(key.to_string(), self.entries.len());
            self.entries.push((key.to_string(), label(), 1));
        }
    }

    fn into_ranking(self, total: usize) -> Ranking {
        let mut entries: Vec<RankedEntry> = self
            .entries
            .into_iter()
            .map(|(key, label, count)| RankedEntry {
                key,
                label,
                count,
                percentage: percentage(count, total),
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        Ranking(entries)
    }
}

/// `100 * count / total` rounded to one decimal, 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
pub fn percentage(count: u64, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = 100.0 * count as f64 / total as f64;
    (pct * 10.0).round() / 10.0
}

/// `true` when the event is treated as a homepage view.
///
/// Heuristic: the root path, or a page name containing "Home"
/// (case-sensitive).
pub fn is_homepage(event: &VisitEvent) -> bool {
    event.page == "/" || event.page_name.as_deref().is_some_and(|n| n.contains("Home"))
}

/// Visits per destination, with homepage views in a synthetic bucket.
///
/// Events that are neither destination nor homepage views are left out of
/// the ranking but still count towards the percentage denominator.
pub fn rank_destinations(events: &[VisitEvent]) -> Ranking {
    let mut tally = Tally::new();
    for event in events {
        if let Some(dest) = event.destination.as_deref() {
            tally.add(dest, || dest.to_string());
        } else if is_homepage(event) {
            tally.add(HOMEPAGE_KEY, || HOMEPAGE_LABEL.to_string());
        }
    }
    tally.into_ranking(events.len())
}

/// Visits per country, skipping events with no or `"Unknown"` country.
///
/// Entries are keyed on their display label, `"{countryCode} - {country}"`
/// or just `country` when the code is missing.
pub fn rank_countries(events: &[VisitEvent]) -> Ranking {
    let mut tally = Tally::new();
    for event in events {
        let Some(country) = event.country.as_deref() else {
            continue;
        };
        if country.is_empty() || country == UNKNOWN_COUNTRY {
            continue;
        }
        let label = country_label(country, event.country_code.as_deref());
        tally.add(&label, || label.clone());
    }
    tally.into_ranking(events.len())
}

fn country_label(country: &str, code: Option<&str>) -> String {
    match code {
        Some(code) if !code.is_empty() => format!("{code} - {country}"),
        _ => country.to_string(),
    }
}
