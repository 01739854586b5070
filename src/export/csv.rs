use crate::analytics::{DashboardStats, Ranking, VisitRow};
use chrono::NaiveDate;

/// Which table a CSV download contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Visitors,
    Destinations,
    Countries,
    Summary,
}

impl ExportKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "visitors" => Some(Self::Visitors),
            "destinations" => Some(Self::Destinations),
            "countries" => Some(Self::Countries),
            "summary" => Some(Self::Summary),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visitors => "visitors",
            Self::Destinations => "destinations",
            Self::Countries => "countries",
            Self::Summary => "summary",
        }
    }

    /// `{kind}_{YYYY-MM-DD}.csv`
    pub fn filename(self, exported_on: NaiveDate) -> String {
        format!("{}_{}.csv", self.as_str(), exported_on.format("%Y-%m-%d"))
    }
}

/// Render a header row and records as CSV text.
///
/// Every field is wrapped in double quotes. Embedded quotes and commas are
/// not escaped, so values containing `"` produce malformed rows. Rows are
/// joined by `\n` with no trailing newline.
pub fn to_csv<R, F>(headers: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<str>,
{
    let mut lines = vec![headers.join(",")];
    for row in rows {
        let fields: Vec<String> = row.iter().map(|f| format!("\"{}\"", f.as_ref())).collect();
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

/// The raw visit table.
pub fn visitors_csv(rows: &[VisitRow]) -> String {
    to_csv(
        &[
            "Date",
            "Time",
            "Page",
            "Destination",
            "Country",
            "City",
            "Device",
            "Language",
            "Screen",
        ],
        rows.iter().map(|r| {
            vec![
                r.date.as_str(),
                r.time.as_str(),
                r.page.as_str(),
                r.destination.as_str(),
                r.country.as_str(),
                r.city.as_str(),
                r.device.as_str(),
                r.language.as_str(),
                r.screen_resolution.as_str(),
            ]
        }),
    )
}

/// A full (untruncated) ranking under the given first-column heading.
pub fn ranking_csv(label_header: &str, ranking: &Ranking) -> String {
    to_csv(
        &[label_header, "Visits", "Percentage"],
        ranking.entries().iter().map(|e| {
            vec![
                e.label.clone(),
                e.count.to_string(),
                format!("{:.1}%", e.percentage),
            ]
        }),
    )
}

pub fn summary_csv(stats: &DashboardStats) -> String {
    let c = stats.counts;
    to_csv(
        &["Metric", "Value"],
        [
            ("Total Visits", c.total),
            ("Today", c.today),
            ("This Week", c.this_week),
            ("This Month", c.this_month),
            ("Destinations Tracked", stats.destination_ranking.len() as u64),
            ("Countries", stats.country_ranking.len() as u64),
        ]
        .into_iter()
        .map(|(metric, value)| vec![metric.to_string(), value.to_string()]),
    )
}

/// Render the export for `kind` from an aggregation result and its raw rows.
pub fn render(kind: ExportKind, stats: &DashboardStats, rows: &[VisitRow]) -> String {
    match kind {
        ExportKind::Visitors => visitors_csv(rows),
        ExportKind::Destinations => ranking_csv("Destination", &stats.destination_ranking),
        ExportKind::Countries => ranking_csv("Country", &stats.country_ranking),
        ExportKind::Summary => summary_csv(stats),
    }
}
