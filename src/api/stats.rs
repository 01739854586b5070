use crate::analytics::{self, AggregationContext, AggregationWindow, DashboardStats, VisitRow};
use crate::api::errors::ApiError;
use crate::export::csv;
use crate::export::ExportKind;
use crate::ingest::handler::AppState;
use crate::storage::{inquiries, visits};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_TOP_N: usize = 5;
const MAX_TOP_N: usize = 100;

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    /// Entries kept in each ranking.
    pub limit: Option<usize>,
}

impl DashboardParams {
    pub fn top_n(&self) -> Result<usize, ApiError> {
        match self.limit {
            None => Ok(DEFAULT_TOP_N),
            Some(n) if (1..=MAX_TOP_N).contains(&n) => Ok(n),
            Some(n) => Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {MAX_TOP_N}, got {n}"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    /// Events actually aggregated. Equal to the cap once the log is full.
    pub window_size: usize,
    pub window_cap: usize,
    /// `true` when older visits fall outside the figures.
    pub window_saturated: bool,
    /// Every visit in the log, including those outside the window.
    pub logged_visits: u64,
    pub unread_inquiries: u64,
}

/// Load the most recent visits and build the aggregation window.
fn load_window(state: &AppState) -> Result<AggregationWindow, ApiError> {
    let conn = state.buffer.conn().lock();
    let events = visits::recent_visits(&conn, state.window_size)?;
    drop(conn);
    Ok(AggregationWindow::new(events, state.window_size))
}

fn context(state: &AppState) -> AggregationContext {
    AggregationContext::new(Utc::now().with_timezone(&state.utc_offset), state.locale)
}

/// GET /api/stats/dashboard: Period counts, rankings and the 14-day series.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let top_n = params.top_n()?;

    let response = tokio::task::spawn_blocking(move || {
        let window = load_window(&state)?;
        let (logged_visits, unread_inquiries) = {
            let conn = state.buffer.conn().lock();
            (visits::count_visits(&conn)?, inquiries::count_unread(&conn)?)
        };
        let stats = analytics::aggregate(&window, &context(&state));
        Ok::<_, ApiError>(DashboardResponse {
            stats: stats.truncated(top_n),
            window_size: window.len(),
            window_cap: window.cap(),
            window_saturated: window.is_saturated(),
            logged_visits,
            unread_inquiries,
        })
    })
    .await??;

    Ok(Json(response))
}

/// GET /api/stats/visits: Raw visit table, newest first.
pub async fn get_visits(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VisitRow>>, ApiError> {
    let rows = tokio::task::spawn_blocking(move || {
        let window = load_window(&state)?;
        Ok::<_, ApiError>(analytics::visit_rows(&window, state.utc_offset))
    })
    .await??;
    Ok(Json(rows))
}

/// GET /api/export/{kind}: CSV download of one dashboard table.
pub async fn get_export(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ExportKind::parse(&kind).ok_or_else(|| {
        ApiError::NotFound(format!(
            "Unknown export '{kind}'. Use 'visitors', 'destinations', 'countries' or 'summary'."
        ))
    })?;

    let exported_on = state.today();
    let body = tokio::task::spawn_blocking(move || {
        let window = load_window(&state)?;
        let stats = analytics::aggregate(&window, &context(&state));
        let rows = match kind {
            ExportKind::Visitors => analytics::visit_rows(&window, state.utc_offset),
            _ => Vec::new(),
        };
        Ok::<_, ApiError>(csv::render(kind, &stats, &rows))
    })
    .await??;

    let disposition = format!("attachment; filename=\"{}\"", kind.filename(exported_on));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
