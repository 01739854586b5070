use crate::api::auth::SessionStore;
use crate::config::Config;
use crate::ingest::buffer::VisitBuffer;
use crate::ingest::geoip::GeoIpReader;
use crate::ingest::ratelimit::RateLimiter;
use crate::ingest::visit_id;
use crate::model::VisitEvent;
use crate::notify::Notifier;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, FixedOffset, Locale, NaiveDate, Utc};
use duckdb::Connection;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Page-view beacon sent by the public site.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPayload {
    /// Path or full URL of the viewed page.
    pub page: String,
    pub page_name: Option<String>,
    pub destination: Option<String>,
    pub destination_type: Option<String>,
    pub language: Option<String>,
    pub screen_resolution: Option<String>,
    /// Visitor's calendar day, `YYYY-MM-DD`. Replaced by the server's day when
    /// missing or malformed.
    pub date: Option<String>,
}

/// Shared application state.
pub struct AppState {
    pub buffer: VisitBuffer,
    pub geoip: GeoIpReader,
    pub visit_limiter: RateLimiter,
    /// Separate bucket so browsing never uses up a visitor's inquiry quota.
    pub inquiry_limiter: RateLimiter,
    pub sessions: SessionStore,
    /// Argon2 PHC string. `None` until the admin password is set up.
    pub admin_password_hash: Mutex<Option<String>>,
    pub dashboard_origin: Option<String>,
    pub window_size: usize,
    pub utc_offset: FixedOffset,
    pub locale: Locale,
    pub notifier: Notifier,
    pub visits_recorded_total: Arc<AtomicU64>,
}

impl AppState {
    /// Wire up state from configuration around an already-migrated connection.
    pub fn from_config(
        config: &Config,
        conn: Arc<Mutex<Connection>>,
    ) -> Result<Self, crate::api::auth::AuthError> {
        let admin_password_hash = config
            .admin_password
            .as_deref()
            .map(crate::api::auth::hash_password)
            .transpose()?;

        Ok(Self {
            buffer: VisitBuffer::new(config.flush_event_count, conn),
            geoip: GeoIpReader::open(config.geoip_db_path.as_deref()),
            visit_limiter: RateLimiter::new(config.rate_limit_per_client),
            inquiry_limiter: RateLimiter::new(config.inquiry_rate_limit_per_client),
            sessions: SessionStore::new(config.session_ttl_secs),
            admin_password_hash: Mutex::new(admin_password_hash),
            dashboard_origin: config.dashboard_origin.clone(),
            window_size: config.effective_window_size(),
            utc_offset: config.utc_offset(),
            locale: config.chart_locale(),
            notifier: Notifier::new(&config.email),
            visits_recorded_total: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Today's date in the reporting timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }
}

/// POST /api/visit: Record one page view.
///
/// Recording never fails the page: storage problems are logged and the
/// beacon still gets `202 Accepted`.
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<VisitPayload>,
) -> impl IntoResponse {
    if payload.page.trim().is_empty() || payload.page.len() > 2048 {
        return StatusCode::BAD_REQUEST;
    }

    let ip = extract_ip(&headers);
    if !state.visit_limiter.check(&ip) {
        tracing::debug!(client = %ip, "Visit rate limit exceeded");
        return StatusCode::TOO_MANY_REQUESTS;
    }

    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok());
    let mut event = build_visit(payload, user_agent, Utc::now(), state.utc_offset);
    state.geoip.lookup(&ip).apply_to(&mut event);

    match state.buffer.push(event) {
        Ok(_) => {
            state.visits_recorded_total.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => tracing::error!(error = %e, "Failed to record visit"),
    }
    StatusCode::ACCEPTED
}

/// Turn a beacon into a visit event stamped at `now`.
fn build_visit(
    payload: VisitPayload,
    user_agent: Option<&str>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> VisitEvent {
    let date = payload
        .date
        .as_deref()
        .filter(|d| {
            d.len() == 10
                && NaiveDate::parse_from_str(d, crate::analytics::periods::DATE_FORMAT).is_ok()
        })
        .map_or_else(
            || {
                now.with_timezone(&offset)
                    .format(crate::analytics::periods::DATE_FORMAT)
                    .to_string()
            },
            str::to_string,
        );

    let mut event = VisitEvent::new(
        visit_id::generate_visit_id(now),
        date,
        sanitize_pathname(&payload.page),
    );
    event.timestamp = Some(now);
    event.page_name = clean_optional(payload.page_name, 256);
    event.destination = clean_optional(payload.destination, 256);
    event.destination_type = clean_optional(payload.destination_type, 64);
    event.user_agent = clean_optional(user_agent.map(str::to_string), 512);
    event.language = clean_optional(payload.language, 35);
    event.screen_resolution = clean_optional(payload.screen_resolution, 32);
    event
}

/// Extract client IP from headers, checking X-Forwarded-For first.
pub fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}

/// Reduce a page URL to its path, dropping scheme, host, query and fragment.
fn sanitize_pathname(page: &str) -> String {
    let path = match page
        .strip_prefix("https://")
        .or_else(|| page.strip_prefix("http://"))
    {
        Some(rest) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => page,
    };
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    sanitize_string(&path, 2048)
}

/// Sanitize, dropping values that end up empty.
fn clean_optional(value: Option<String>, max_len: usize) -> Option<String> {
    value
        .map(|v| sanitize_string(v.trim(), max_len))
        .filter(|v| !v.is_empty())
}

/// Sanitize a string by truncating to max length and removing control characters.
fn sanitize_string(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect()
}
