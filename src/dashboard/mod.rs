use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

/// Admin dashboard: a static page plus script that calls the stats, export,
/// inquiry and package endpoints.
#[derive(Embed)]
#[folder = "src/dashboard/assets/"]
struct Assets;

/// GET /{*path}
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    serve_file(&path)
}

/// GET /
pub async fn serve_index() -> Response {
    serve_file("index.html")
}

fn serve_file(path: &str) -> Response {
    let Some(content) = Assets::get(path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    // The page is small; always revalidate so a redeploy is picked up.
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        content.data.into_owned(),
    )
        .into_response()
}
