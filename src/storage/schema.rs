use chrono::{DateTime, Utc};
use duckdb::Connection;

/// Append-only visit log, one row per page view.
pub const CREATE_VISITS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS visits (
    visit_id          VARCHAR NOT NULL,
    date              VARCHAR NOT NULL,
    timestamp         TIMESTAMP,
    page              VARCHAR NOT NULL,
    page_name         VARCHAR,
    destination       VARCHAR,
    destination_type  VARCHAR,
    user_agent        VARCHAR,
    language          VARCHAR,
    screen_resolution VARCHAR,
    country           VARCHAR,
    country_code      VARCHAR,
    city              VARCHAR,
    region            VARCHAR
)
";

/// Tour package catalogue. `features` holds a JSON array of strings.
pub const CREATE_PACKAGES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS packages (
    id            VARCHAR PRIMARY KEY,
    title         VARCHAR NOT NULL,
    subtitle      VARCHAR NOT NULL,
    description   VARCHAR NOT NULL,
    features      VARCHAR NOT NULL,
    price         DOUBLE NOT NULL,
    package_type  VARCHAR NOT NULL,
    display_order INTEGER NOT NULL
)
";

pub const CREATE_INQUIRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS inquiries (
    id               VARCHAR PRIMARY KEY,
    name             VARCHAR NOT NULL,
    email            VARCHAR NOT NULL,
    country          VARCHAR NOT NULL,
    message          VARCHAR NOT NULL,
    package_interest VARCHAR,
    status           VARCHAR NOT NULL,
    is_read          BOOLEAN NOT NULL DEFAULT false,
    email_sent       BOOLEAN NOT NULL DEFAULT false,
    timestamp        TIMESTAMP NOT NULL,
    kind             VARCHAR NOT NULL
)
";

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(CREATE_VISITS_TABLE)?;
    conn.execute_batch(CREATE_PACKAGES_TABLE)?;
    conn.execute_batch(CREATE_INQUIRIES_TABLE)?;
    Ok(())
}

/// Render an instant for `CAST(? AS TIMESTAMP)`. Stored timestamps are UTC.
pub fn timestamp_param(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Inverse of selecting `epoch_us(timestamp)`.
pub fn timestamp_from_micros(us: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
}
