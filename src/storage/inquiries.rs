use crate::model::{Inquiry, InquiryKind, InquiryStatus};
use crate::storage::schema::{timestamp_from_micros, timestamp_param};
use duckdb::Connection;

/// Which inquiries the triage view lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl ReadFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "unread" => Some(Self::Unread),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

pub fn insert_inquiry(conn: &Connection, inquiry: &Inquiry) -> Result<(), duckdb::Error> {
    conn.execute(
        "INSERT INTO inquiries (id, name, email, country, message, package_interest,
         status, is_read, email_sent, timestamp, kind)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), ?)",
        duckdb::params![
            inquiry.id,
            inquiry.name,
            inquiry.email,
            inquiry.country,
            inquiry.message,
            inquiry.package_interest,
            inquiry.status.as_str(),
            inquiry.read,
            inquiry.email_sent,
            timestamp_param(inquiry.timestamp),
            inquiry.kind.as_str(),
        ],
    )?;
    Ok(())
}

/// Inquiries matching the filters, newest first.
pub fn list_inquiries(
    conn: &Connection,
    read: ReadFilter,
    kind: Option<InquiryKind>,
) -> Result<Vec<Inquiry>, duckdb::Error> {
    let read_clause = match read {
        ReadFilter::All => "",
        ReadFilter::Unread => " AND NOT is_read",
        ReadFilter::Read => " AND is_read",
    };
    let (kind_clause, params) = match kind {
        Some(k) => (" AND kind = ?", vec![k.as_str().to_string()]),
        None => ("", Vec::new()),
    };
    // Clauses come from fixed strings; the kind value is bound as a parameter.
    let sql = format!(
        "SELECT id, name, email, country, message, package_interest, status, is_read,
                email_sent, epoch_us(timestamp), kind
         FROM inquiries
         WHERE true{read_clause}{kind_clause}
         ORDER BY timestamp DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(duckdb::params_from_iter(params), row_to_inquiry)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_inquiry(conn: &Connection, id: &str) -> Result<Option<Inquiry>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, country, message, package_interest, status, is_read,
                email_sent, epoch_us(timestamp), kind
         FROM inquiries WHERE id = ?",
    )?;
    let mut rows = stmt.query_map(duckdb::params![id], row_to_inquiry)?;
    rows.next().transpose()
}

/// Flip the read flag. Returns `false` when no inquiry has this id.
pub fn mark_read(conn: &Connection, id: &str) -> Result<bool, duckdb::Error> {
    let changed = conn.execute(
        "UPDATE inquiries SET is_read = true WHERE id = ?",
        duckdb::params![id],
    )?;
    Ok(changed > 0)
}

/// Record that the notification email went out.
pub fn set_email_sent(conn: &Connection, id: &str) -> Result<bool, duckdb::Error> {
    let changed = conn.execute(
        "UPDATE inquiries SET email_sent = true WHERE id = ?",
        duckdb::params![id],
    )?;
    Ok(changed > 0)
}

/// Number of inquiries not yet marked read.
pub fn count_unread(conn: &Connection) -> Result<u64, duckdb::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM inquiries WHERE NOT is_read",
        [],
        |row| row.get(0),
    )
}

fn row_to_inquiry(row: &duckdb::Row<'_>) -> Result<Inquiry, duckdb::Error> {
    let status: String = row.get(6)?;
    let micros: i64 = row.get(9)?;
    let kind: String = row.get(10)?;
    Ok(Inquiry {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        country: row.get(3)?,
        message: row.get(4)?,
        package_interest: row.get(5)?,
        status: InquiryStatus::parse(&status),
        read: row.get(7)?,
        email_sent: row.get(8)?,
        timestamp: timestamp_from_micros(micros).unwrap_or_default(),
        kind: InquiryKind::parse(&kind).unwrap_or(InquiryKind::Contact),
    })
}
