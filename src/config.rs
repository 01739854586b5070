use chrono::{FixedOffset, Locale};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Buffered visits that trigger an immediate append to the log.
    #[serde(default = "default_flush_count")]
    pub flush_event_count: usize,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Number of most-recent visits the dashboard aggregates.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Offset from UTC, in minutes, used for "today", week/month boundaries
    /// and server-side visit dates. Default is UTC+7.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// POSIX locale name for chart labels, e.g. `en_US` or `fr_FR`.
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Path to a MaxMind GeoLite2 .mmdb file for IP geolocation.
    /// If not set or file is missing, visits carry no location.
    #[serde(default)]
    pub geoip_db_path: Option<PathBuf>,
    /// Dashboard origin for CORS restrictions on admin routes.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Visits per minute accepted from one client. 0 = no limit.
    #[serde(default)]
    pub rate_limit_per_client: u32,
    /// Inquiry submissions per minute accepted from one client. 0 = no limit.
    /// Counted separately from visits.
    #[serde(default = "default_inquiry_rate_limit")]
    pub inquiry_rate_limit_per_client: u32,
    /// Admin password. When unset, the first `POST /api/auth/setup` chooses it.
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default)]
    pub email: EmailConfig,
}

/// SMTP settings for inquiry notifications. Notifications are off unless
/// `smtp_host` and `notify_to` are both set.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,
    #[serde(default = "default_smtp_use_tls")]
    pub smtp_use_tls: bool,
    /// Address that receives a copy of every new inquiry.
    #[serde(default)]
    pub notify_to: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

const fn default_flush_count() -> usize {
    50
}

const fn default_flush_interval_secs() -> u64 {
    10
}

const fn default_window_size() -> usize {
    crate::analytics::window::DEFAULT_WINDOW_SIZE
}

const fn default_utc_offset_minutes() -> i32 {
    7 * 60
}

fn default_locale() -> String {
    "en_US".to_string()
}

const fn default_session_ttl_secs() -> u64 {
    86400
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

const fn default_inquiry_rate_limit() -> u32 {
    5
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "bookings@localhost".to_string()
}

const fn default_smtp_use_tls() -> bool {
    true
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            smtp_from: default_smtp_from(),
            smtp_use_tls: default_smtp_use_tls(),
            notify_to: None,
        }
    }
}

impl EmailConfig {
    pub const fn is_enabled(&self) -> bool {
        self.smtp_host.is_some() && self.notify_to.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            flush_event_count: default_flush_count(),
            flush_interval_secs: default_flush_interval_secs(),
            window_size: default_window_size(),
            utc_offset_minutes: default_utc_offset_minutes(),
            locale: default_locale(),
            geoip_db_path: None,
            dashboard_origin: None,
            session_ttl_secs: default_session_ttl_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            rate_limit_per_client: 0,
            inquiry_rate_limit_per_client: default_inquiry_rate_limit(),
            admin_password: None,
            email: EmailConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `TRIPDESK_HOST` → host
    /// - `TRIPDESK_PORT` → port
    /// - `TRIPDESK_DATA_DIR` → data_dir
    /// - `TRIPDESK_FLUSH_COUNT` → flush_event_count
    /// - `TRIPDESK_FLUSH_INTERVAL` → flush_interval_secs
    /// - `TRIPDESK_WINDOW_SIZE` → window_size
    /// - `TRIPDESK_UTC_OFFSET_MINUTES` → utc_offset_minutes
    /// - `TRIPDESK_LOCALE` → locale
    /// - `TRIPDESK_GEOIP_DB` → geoip_db_path
    /// - `TRIPDESK_DASHBOARD_ORIGIN` → dashboard_origin
    /// - `TRIPDESK_SESSION_TTL` → session_ttl_secs
    /// - `TRIPDESK_SHUTDOWN_TIMEOUT` → shutdown_timeout_secs
    /// - `TRIPDESK_RATE_LIMIT` → rate_limit_per_client
    /// - `TRIPDESK_INQUIRY_RATE_LIMIT` → inquiry_rate_limit_per_client
    /// - `TRIPDESK_ADMIN_PASSWORD` → admin_password
    /// - `TRIPDESK_SMTP_HOST`, `TRIPDESK_SMTP_PORT`, `TRIPDESK_SMTP_USERNAME`,
    ///   `TRIPDESK_SMTP_PASSWORD`, `TRIPDESK_SMTP_FROM`, `TRIPDESK_NOTIFY_TO` → email
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply `TRIPDESK_*` overrides read through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("TRIPDESK_HOST") {
            self.host = host;
        }
        if let Some(p) = var("TRIPDESK_PORT").and_then(|v| v.parse().ok()) {
            self.port = p;
        }
        if let Some(dir) = var("TRIPDESK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(c) = var("TRIPDESK_FLUSH_COUNT").and_then(|v| v.parse().ok()) {
            self.flush_event_count = c;
        }
        if let Some(i) = var("TRIPDESK_FLUSH_INTERVAL").and_then(|v| v.parse().ok()) {
            self.flush_interval_secs = i;
        }
        if let Some(w) = var("TRIPDESK_WINDOW_SIZE").and_then(|v| v.parse().ok()) {
            self.window_size = w;
        }
        if let Some(o) = var("TRIPDESK_UTC_OFFSET_MINUTES").and_then(|v| v.parse().ok()) {
            self.utc_offset_minutes = o;
        }
        if let Some(locale) = var("TRIPDESK_LOCALE") {
            self.locale = locale;
        }
        if let Some(geoip) = var("TRIPDESK_GEOIP_DB") {
            self.geoip_db_path = Some(PathBuf::from(geoip));
        }
        if let Some(origin) = var("TRIPDESK_DASHBOARD_ORIGIN") {
            self.dashboard_origin = Some(origin);
        }
        if let Some(t) = var("TRIPDESK_SESSION_TTL").and_then(|v| v.parse().ok()) {
            self.session_ttl_secs = t;
        }
        if let Some(t) = var("TRIPDESK_SHUTDOWN_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.shutdown_timeout_secs = t;
        }
        if let Some(r) = var("TRIPDESK_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.rate_limit_per_client = r;
        }
        if let Some(r) = var("TRIPDESK_INQUIRY_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.inquiry_rate_limit_per_client = r;
        }
        if let Some(pw) = var("TRIPDESK_ADMIN_PASSWORD") {
            self.admin_password = Some(pw);
        }
        if let Some(host) = var("TRIPDESK_SMTP_HOST") {
            self.email.smtp_host = Some(host);
        }
        if let Some(p) = var("TRIPDESK_SMTP_PORT").and_then(|v| v.parse().ok()) {
            self.email.smtp_port = p;
        }
        if let Some(user) = var("TRIPDESK_SMTP_USERNAME") {
            self.email.smtp_username = Some(user);
        }
        if let Some(pw) = var("TRIPDESK_SMTP_PASSWORD") {
            self.email.smtp_password = Some(pw);
        }
        if let Some(from) = var("TRIPDESK_SMTP_FROM") {
            self.email.smtp_from = from;
        }
        if let Some(to) = var("TRIPDESK_NOTIFY_TO") {
            self.email.notify_to = Some(to);
        }
    }

    /// Path of the DuckDB database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("tripdesk.duckdb")
    }

    /// The configured UTC offset. Out-of-range values fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(
                    minutes = self.utc_offset_minutes,
                    "Invalid utc_offset_minutes, using UTC"
                );
                FixedOffset::east_opt(0).unwrap_or_else(|| unreachable!())
            })
    }

    /// The configured chart locale. Unknown names fall back to `en_US`.
    pub fn chart_locale(&self) -> Locale {
        Locale::try_from(self.locale.as_str()).unwrap_or_else(|_| {
            tracing::warn!(locale = %self.locale, "Unknown locale, using en_US");
            Locale::en_US
        })
    }

    /// Window size clamped to at least one event.
    pub fn effective_window_size(&self) -> usize {
        self.window_size.max(1)
    }
}
