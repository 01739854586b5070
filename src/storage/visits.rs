use crate::model::VisitEvent;
use crate::storage::schema::{timestamp_from_micros, timestamp_param};
use duckdb::Connection;

/// Append events to the visit log. Returns the number of rows written.
///
/// The log is append-only; there is no update or delete path.
pub fn append_visits(conn: &Connection, events: &[VisitEvent]) -> Result<usize, duckdb::Error> {
    if events.is_empty() {
        return Ok(0);
    }

    let mut stmt = conn.prepare(
        "INSERT INTO visits (visit_id, date, timestamp, page, page_name, destination,
         destination_type, user_agent, language, screen_resolution, country,
         country_code, city, region)
         VALUES (?, ?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;

    let mut written = 0usize;
    for event in events {
        written += stmt.execute(duckdb::params![
            event.visit_id,
            event.date,
            event.timestamp.map(timestamp_param),
            event.page,
            event.page_name,
            event.destination,
            event.destination_type,
            event.user_agent,
            event.language,
            event.screen_resolution,
            event.country,
            event.country_code,
            event.city,
            event.region,
        ])?;
    }
    Ok(written)
}

/// The `limit` most recent events, newest first. Events without a
/// timestamp come last.
pub fn recent_visits(conn: &Connection, limit: usize) -> Result<Vec<VisitEvent>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT visit_id, date, epoch_us(timestamp), page, page_name, destination,
                destination_type, user_agent, language, screen_resolution, country,
                country_code, city, region
         FROM visits
         ORDER BY timestamp DESC NULLS LAST
         LIMIT ?",
    )?;
    let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(duckdb::params![limit_i64], |row| {
            let micros: Option<i64> = row.get(2)?;
            Ok(VisitEvent {
                visit_id: row.get(0)?,
                date: row.get(1)?,
                timestamp: micros.and_then(timestamp_from_micros),
                page: row.get(3)?,
                page_name: row.get(4)?,
                destination: row.get(5)?,
                destination_type: row.get(6)?,
                user_agent: row.get(7)?,
                language: row.get(8)?,
                screen_resolution: row.get(9)?,
                country: row.get(10)?,
                country_code: row.get(11)?,
                city: row.get(12)?,
                region: row.get(13)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of events in the whole log, not just the aggregation window.
pub fn count_visits(conn: &Connection) -> Result<u64, duckdb::Error> {
    conn.query_row("SELECT COUNT(*) FROM visits", [], |row| row.get(0))
}
