use crate::api::{auth, inquiries, packages, stats};
use crate::dashboard;
use crate::ingest::handler::{record_visit, AppState};
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // The public site may be served from another origin than the API.
    let public_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let admin_cors = build_admin_cors(state.dashboard_origin.as_deref());

    let auth_routes = Router::new()
        .route("/auth/setup", post(auth::auth_setup))
        .route("/auth/login", post(auth::auth_login))
        .route("/auth/logout", post(auth::auth_logout))
        .route("/auth/status", get(auth::auth_status));

    let admin_routes = Router::new()
        .route("/stats/dashboard", get(stats::get_dashboard))
        .route("/stats/visits", get(stats::get_visits))
        .route("/export/{kind}", get(stats::get_export))
        .route("/inquiries/{id}/read", post(inquiries::mark_inquiry_read))
        .route("/packages/{id}", put(packages::update_package))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    // 16 KB is ample for a beacon or an inquiry form.
    let public_routes = Router::new()
        .route("/visit", post(record_visit))
        .route(
            "/inquiries",
            post(inquiries::submit_inquiry).get(inquiries::list_inquiries),
        )
        .route("/packages", get(packages::list_packages))
        .layer(DefaultBodyLimit::max(16_384))
        .layer(public_cors);

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(auth_routes.merge(admin_routes).layer(admin_cors));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api", api_routes)
        .route("/", get(dashboard::serve_index))
        .route("/{*path}", get(dashboard::serve_asset))
        .layer(axum::middleware::map_response(add_security_headers))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(30),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Inject OWASP-recommended security headers on every HTTP response.
async fn add_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    let is_html = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/html"));
    if is_html {
        headers.insert(
            "content-security-policy",
            HeaderValue::from_static("default-src 'self'; script-src 'self'; style-src 'self'"),
        );
    }
    response
}

/// CORS for admin and auth routes. Credentials are only allowed when a
/// dashboard origin is configured.
fn build_admin_cors(dashboard_origin: Option<&str>) -> CorsLayer {
    let origin = dashboard_origin.and_then(|o| o.parse::<HeaderValue>().ok());
    origin.map_or_else(
        || {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        },
        |origin| {
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
                .allow_credentials(true)
        },
    )
}

/// GET /health
async fn health_check() -> &'static str {
    "ok"
}

/// GET /health/detailed
async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "buffered_visits": state.buffer.len(),
        "auth_configured": state.admin_password_hash.lock().is_some(),
        "geoip_loaded": state.geoip.is_loaded(),
        "email_enabled": state.notifier.is_enabled(),
        "window_size": state.window_size,
        "utc_offset_secs": state.utc_offset.local_minus_utc(),
    }))
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    use std::sync::atomic::Ordering;

    let gauges = [
        (
            "tripdesk_buffered_visits",
            "gauge",
            "Visits waiting in the in-memory buffer",
            state.buffer.len() as u64,
        ),
        (
            "tripdesk_visits_recorded_total",
            "counter",
            "Visits accepted since startup",
            state.visits_recorded_total.load(Ordering::Relaxed),
        ),
        (
            "tripdesk_active_sessions",
            "gauge",
            "Admin sessions currently held",
            state.sessions.len() as u64,
        ),
        (
            "tripdesk_visit_limiter_clients",
            "gauge",
            "Clients tracked by the visit rate limiter",
            state.visit_limiter.tracked_clients() as u64,
        ),
        (
            "tripdesk_inquiry_limiter_clients",
            "gauge",
            "Clients tracked by the inquiry rate limiter",
            state.inquiry_limiter.tracked_clients() as u64,
        ),
        (
            "tripdesk_geoip_loaded",
            "gauge",
            "Whether a GeoIP database is loaded",
            u64::from(state.geoip.is_loaded()),
        ),
        (
            "tripdesk_auth_configured",
            "gauge",
            "Whether the admin password is set",
            u64::from(state.admin_password_hash.lock().is_some()),
        ),
    ];

    let out = gauges
        .iter()
        .map(|(name, kind, help, value)| {
            format!("# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n")
        })
        .collect::<String>();

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
