use crate::api::errors::ApiError;
use crate::ingest::handler::AppState;
use crate::model::{PackageUpdate, TourPackage};
use crate::storage::packages;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

/// GET /api/packages: The public catalogue, in display order.
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TourPackage>>, ApiError> {
    let list = tokio::task::spawn_blocking(move || {
        let conn = state.buffer.conn().lock();
        packages::list_packages(&conn)
    })
    .await??;
    Ok(Json(list))
}

/// PUT /api/packages/{id}: Replace every editable field of a package.
pub async fn update_package(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<PackageUpdate>,
) -> Result<Json<TourPackage>, ApiError> {
    update.validate().map_err(ApiError::BadRequest)?;
    let package = update.into_package(id.clone());

    let stored = tokio::task::spawn_blocking(move || {
        let conn = state.buffer.conn().lock();
        if packages::update_package(&conn, &package)? {
            packages::get_package(&conn, &package.id)
        } else {
            Ok(None)
        }
    })
    .await??;

    let package = stored.ok_or_else(|| ApiError::NotFound(format!("package '{id}' not found")))?;
    tracing::info!(id = %package.id, "Package updated");
    Ok(Json(package))
}
