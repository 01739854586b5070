use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use duckdb::Connection;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::ServiceExt;
use tripdesk::config::Config;
use tripdesk::ingest::handler::AppState;
use tripdesk::server::build_router;
use tripdesk::storage::{migrations, visits};

const PASSWORD: &str = "mekong-sunset";

fn make_state(config: &Config) -> Arc<AppState> {
    let conn = Connection::open_in_memory().unwrap();
    migrations::run_migrations(&conn).unwrap();
    Arc::new(AppState::from_config(config, Arc::new(Mutex::new(conn))).unwrap())
}

/// State with a known admin password that flushes every visit immediately.
fn test_state() -> Arc<AppState> {
    make_state(&Config {
        admin_password: Some(PASSWORD.to_string()),
        flush_event_count: 1,
        ..Config::default()
    })
}

fn app(state: &Arc<AppState>) -> Router {
    build_router(Arc::clone(state))
}

async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.5")
        .header("user-agent", "Mozilla/5.0 (iPhone) Mobile Safari");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app(state).oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn login(state: &Arc<AppState>) -> String {
    let response = send(
        state,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("tripdesk_session="));
    assert!(cookie.contains("HttpOnly"));
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn record_sample_visits(state: &Arc<AppState>) {
    let visits = [
        serde_json::json!({ "page": "/", "pageName": "Home" }),
        serde_json::json!({
            "page": "/destinations/luang-prabang",
            "destination": "Luang Prabang",
            "destinationType": "city"
        }),
        serde_json::json!({
            "page": "https://laostours.example/destinations/luang-prabang?utm=x",
            "destination": "Luang Prabang",
            "language": "fr-FR"
        }),
    ];
    for visit in visits {
        let response = send(state, "POST", "/api/visit", None, Some(visit)).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}

#[tokio::test]
async fn test_visits_flow_into_dashboard() {
    let state = test_state();
    record_sample_visits(&state).await;
    assert_eq!(visits::count_visits(&state.buffer.conn().lock()).unwrap(), 3);

    let token = login(&state).await;
    let response = send(&state, "GET", "/api/stats/dashboard", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;

    assert_eq!(stats["total"], 3);
    assert_eq!(stats["today"], 3);
    assert_eq!(stats["windowSize"], 3);
    assert_eq!(stats["windowCap"], 200);
    assert_eq!(stats["windowSaturated"], false);
    assert_eq!(stats["loggedVisits"], 3);
    assert_eq!(stats["unreadInquiries"], 0);

    let ranking = stats["destinationRanking"].as_array().unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0]["label"], "Luang Prabang");
    assert_eq!(ranking[0]["count"], 2);
    assert_eq!(ranking[0]["percentage"], 66.7);
    assert_eq!(ranking[1]["label"], "Home Page");
    assert_eq!(ranking[1]["percentage"], 33.3);

    // No GeoIP database: no countries ranked.
    assert!(stats["countryRanking"].as_array().unwrap().is_empty());

    let series = stats["series14Day"].as_array().unwrap();
    assert_eq!(series.len(), 14);
    assert_eq!(series[13]["visitors"], 3);
    assert_eq!(series[13]["destinations"], 2);
}

#[tokio::test]
async fn test_dashboard_limit_truncates_rankings() {
    let state = test_state();
    record_sample_visits(&state).await;
    let token = login(&state).await;

    let response = send(&state, "GET", "/api/stats/dashboard?limit=1", Some(&token), None).await;
    let stats = body_json(response).await;
    assert_eq!(stats["destinationRanking"].as_array().unwrap().len(), 1);
    assert_eq!(stats["total"], 3);

    let response = send(&state, "GET", "/api/stats/dashboard?limit=0", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dashboard_reports_full_window_and_unread_inquiries() {
    let state = make_state(&Config {
        admin_password: Some(PASSWORD.to_string()),
        flush_event_count: 1,
        window_size: 2,
        ..Config::default()
    });
    record_sample_visits(&state).await;
    let response = send(&state, "POST", "/api/inquiries", None, Some(contact_inquiry())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let token = login(&state).await;

    let stats = body_json(send(&state, "GET", "/api/stats/dashboard", Some(&token), None).await).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["windowSize"], 2);
    assert_eq!(stats["windowCap"], 2);
    assert_eq!(stats["windowSaturated"], true);
    assert_eq!(stats["loggedVisits"], 3);
    assert_eq!(stats["unreadInquiries"], 1);
}

#[tokio::test]
async fn test_visit_table_rows() {
    let state = test_state();
    record_sample_visits(&state).await;
    let token = login(&state).await;

    let rows = body_json(send(&state, "GET", "/api/stats/visits", Some(&token), None).await).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["device"] == "Mobile"));
    assert!(rows
        .iter()
        .any(|r| r["page"] == "/destinations/luang-prabang" && r["language"] == "fr-FR"));
}

#[tokio::test]
async fn test_csv_exports() {
    let state = test_state();
    record_sample_visits(&state).await;
    let token = login(&state).await;

    let response = send(&state, "GET", "/api/export/destinations", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let expected_name = format!("destinations_{}.csv", state.today().format("%Y-%m-%d"));
    assert!(disposition.contains(&expected_name), "{disposition}");
    let csv = body_text(response).await;
    assert_eq!(
        csv,
        "Destination,Visits,Percentage\n\"Luang Prabang\",\"2\",\"66.7%\"\n\"Home Page\",\"1\",\"33.3%\""
    );

    let visitors = body_text(send(&state, "GET", "/api/export/visitors", Some(&token), None).await).await;
    assert_eq!(visitors.lines().count(), 4);
    assert!(visitors.starts_with("Date,Time,Page,"));

    let summary = body_text(send(&state, "GET", "/api/export/summary", Some(&token), None).await).await;
    assert!(summary.contains("\"Total Visits\",\"3\""));

    let response = send(&state, "GET", "/api/export/bookings", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_visit_requires_page() {
    let state = test_state();
    let response = send(
        &state,
        "POST",
        "/api/visit",
        None,
        Some(serde_json::json!({ "page": "  " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&state, "POST", "/api/visit", None, Some(serde_json::json!({}))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_visit_rate_limit() {
    let state = make_state(&Config {
        rate_limit_per_client: 1,
        ..Config::default()
    });
    let visit = serde_json::json!({ "page": "/" });
    let first = send(&state, "POST", "/api/visit", None, Some(visit.clone())).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let second = send(&state, "POST", "/api/visit", None, Some(visit)).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(state.buffer.len(), 1);
}

fn contact_inquiry() -> serde_json::Value {
    serde_json::json!({
        "name": "Kenji",
        "email": "kenji@example.com",
        "message": "Do you run tours in the rainy season?",
        "kind": "contact"
    })
}

#[tokio::test]
async fn test_browsing_does_not_use_inquiry_quota() {
    let state = make_state(&Config {
        rate_limit_per_client: 3,
        inquiry_rate_limit_per_client: 1,
        ..Config::default()
    });
    for _ in 0..3 {
        let response = send(&state, "POST", "/api/visit", None, Some(serde_json::json!({ "page": "/" }))).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
    let response = send(&state, "POST", "/api/visit", None, Some(serde_json::json!({ "page": "/" }))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = send(&state, "POST", "/api/inquiries", None, Some(contact_inquiry())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The inquiry bucket has its own limit.
    let response = send(&state, "POST", "/api/inquiries", None, Some(contact_inquiry())).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_inquiry_pipeline() {
    let state = test_state();
    let response = send(
        &state,
        "POST",
        "/api/inquiries",
        None,
        Some(serde_json::json!({
            "name": "Sofia",
            "email": "sofia@example.com",
            "country": "Spain",
            "message": "Is the northern loop possible in April?",
            "packageInterest": "northern-loop",
            "kind": "booking"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["read"], false);
    assert_eq!(created["emailSent"], false);
    let id = created["id"].as_str().unwrap().to_string();

    // Listing is admin-only.
    let response = send(&state, "GET", "/api/inquiries", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = login(&state).await;
    let unread = body_json(send(&state, "GET", "/api/inquiries?filter=unread", Some(&token), None).await).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);

    let uri = format!("/api/inquiries/{id}/read");
    let marked = body_json(send(&state, "POST", &uri, Some(&token), None).await).await;
    assert_eq!(marked["read"], true);

    let unread = body_json(send(&state, "GET", "/api/inquiries?filter=unread", Some(&token), None).await).await;
    assert!(unread.as_array().unwrap().is_empty());
    let bookings = body_json(send(&state, "GET", "/api/inquiries?kind=booking", Some(&token), None).await).await;
    assert_eq!(bookings.as_array().unwrap().len(), 1);

    let response = send(&state, "POST", "/api/inquiries/missing/read", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inquiry_validation() {
    let state = test_state();
    let response = send(
        &state,
        "POST",
        "/api/inquiries",
        None,
        Some(serde_json::json!({
            "name": "Sofia",
            "email": "not-an-email",
            "message": "Hello",
            "kind": "contact"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &state,
        "POST",
        "/api/inquiries",
        None,
        Some(serde_json::json!({
            "name": "Sofia",
            "email": "sofia@example.com",
            "message": "Book me",
            "kind": "booking"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_package_catalogue_and_edit() {
    let state = test_state();
    let list = body_json(send(&state, "GET", "/api/packages", None, None).await).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 4);
    let first = list[0].clone();
    let id = first["id"].as_str().unwrap().to_string();

    let update = serde_json::json!({
        "title": "Northern Loop Deluxe",
        "subtitle": first["subtitle"],
        "description": first["description"],
        "features": ["Boat trip", "Night market"],
        "price": 1299.0,
        "packageType": first["packageType"],
        "displayOrder": first["displayOrder"]
    });
    let uri = format!("/api/packages/{id}");

    let response = send(&state, "PUT", &uri, None, Some(update.clone())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = login(&state).await;
    let response = send(&state, "PUT", &uri, Some(&token), Some(update.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let list = body_json(send(&state, "GET", "/api/packages", None, None).await).await;
    let edited = list
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id.as_str())
        .unwrap()
        .clone();
    assert_eq!(edited["title"], "Northern Loop Deluxe");
    assert_eq!(edited["price"], 1299.0);
    assert_eq!(edited["features"].as_array().unwrap().len(), 2);

    let mut bad = update.clone();
    bad["price"] = serde_json::json!(-5.0);
    let response = send(&state, "PUT", &uri, Some(&token), Some(bad)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&state, "PUT", "/api/packages/atlantis", Some(&token), Some(update)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_first_run_setup() {
    let state = make_state(&Config::default());

    let status = body_json(send(&state, "GET", "/api/auth/status", None, None).await).await;
    assert_eq!(status["setupRequired"], true);
    assert_eq!(status["authenticated"], false);

    let response = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &state,
        "POST",
        "/api/auth/setup",
        None,
        Some(serde_json::json!({ "password": "short" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &state,
        "POST",
        "/api/auth/setup",
        None,
        Some(serde_json::json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"].as_str().unwrap().to_string();

    let status = body_json(send(&state, "GET", "/api/auth/status", Some(&token), None).await).await;
    assert_eq!(status["setupRequired"], false);
    assert_eq!(status["authenticated"], true);

    let response = send(
        &state,
        "POST",
        "/api/auth/setup",
        None,
        Some(serde_json::json!({ "password": "another-password" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let state = test_state();
    let token = login(&state).await;
    let response = send(&state, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, "GET", "/api/stats/dashboard", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let state = test_state();
    let response = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "password": "guess-guess" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
