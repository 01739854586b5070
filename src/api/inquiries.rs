use crate::api::auth::AdminSession;
use crate::api::errors::ApiError;
use crate::ingest::handler::{extract_ip, AppState};
use crate::model::{Inquiry, InquiryKind, NewInquiry};
use crate::storage::inquiries::{self, ReadFilter};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub filter: Option<String>,
    pub kind: Option<String>,
}

impl ListParams {
    fn parse(&self) -> Result<(ReadFilter, Option<InquiryKind>), ApiError> {
        let filter = match self.filter.as_deref() {
            None => ReadFilter::All,
            Some(f) => ReadFilter::parse(f).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid filter: '{f}'. Use 'all', 'unread' or 'read'."
                ))
            })?,
        };
        let kind = self
            .kind
            .as_deref()
            .map(|k| {
                InquiryKind::parse(k).ok_or_else(|| {
                    ApiError::BadRequest(format!("Invalid kind: '{k}'. Use 'booking' or 'contact'."))
                })
            })
            .transpose()?;
        Ok((filter, kind))
    }
}

/// POST /api/inquiries: Store a booking request or contact message.
///
/// Responds once the inquiry is stored. The notification email is sent in
/// the background and its outcome only affects `emailSent`.
pub async fn submit_inquiry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(new): Json<NewInquiry>,
) -> Result<(StatusCode, Json<Inquiry>), ApiError> {
    new.validate().map_err(ApiError::BadRequest)?;
    if !state.inquiry_limiter.check(&extract_ip(&headers)) {
        return Err(ApiError::TooManyRequests(
            "too many submissions, try again later".to_string(),
        ));
    }

    let inquiry = new.into_inquiry(uuid::Uuid::new_v4().to_string(), Utc::now());
    let stored = inquiry.clone();
    let state2 = Arc::clone(&state);
    tokio::task::spawn_blocking(move || {
        let conn = state2.buffer.conn().lock();
        inquiries::insert_inquiry(&conn, &stored)
    })
    .await??;
    tracing::info!(id = %inquiry.id, kind = inquiry.kind.as_str(), "Inquiry received");

    if state.notifier.is_enabled() {
        let pending = inquiry.clone();
        tokio::spawn(async move { notify(state, pending).await });
    }

    Ok((StatusCode::CREATED, Json(inquiry)))
}

async fn notify(state: Arc<AppState>, inquiry: Inquiry) {
    match state.notifier.notify_inquiry(&inquiry).await {
        Ok(true) => {
            let id = inquiry.id.clone();
            let result = tokio::task::spawn_blocking(move || {
                let conn = state.buffer.conn().lock();
                inquiries::set_email_sent(&conn, &id)
            })
            .await;
            match result {
                Ok(Ok(_)) => tracing::debug!(id = %inquiry.id, "Inquiry notification sent"),
                Ok(Err(e)) => tracing::warn!(id = %inquiry.id, error = %e, "Failed to flag inquiry as emailed"),
                Err(e) => tracing::warn!(id = %inquiry.id, error = %e, "Email flag task failed"),
            }
        }
        Ok(false) => {}
        Err(e) => tracing::warn!(id = %inquiry.id, error = %e, "Inquiry notification failed"),
    }
}

/// GET /api/inquiries: Triage list, newest first.
pub async fn list_inquiries(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Inquiry>>, ApiError> {
    let (filter, kind) = params.parse()?;
    let list = tokio::task::spawn_blocking(move || {
        let conn = state.buffer.conn().lock();
        inquiries::list_inquiries(&conn, filter, kind)
    })
    .await??;
    Ok(Json(list))
}

/// POST /api/inquiries/{id}/read: Mark an inquiry as read.
pub async fn mark_inquiry_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Inquiry>, ApiError> {
    let updated = tokio::task::spawn_blocking(move || {
        let conn = state.buffer.conn().lock();
        if inquiries::mark_read(&conn, &id)? {
            inquiries::get_inquiry(&conn, &id)
        } else {
            Ok(None)
        }
    })
    .await??;
    updated
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("inquiry not found".to_string()))
}
