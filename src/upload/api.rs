//! Static serving of uploaded files.
//!
//! `GET /uploads/:filename` — serve a stored file with long-lived cache
//! headers. No auth required; content-hash filenames are unguessable.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::state::AppState;

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    match state.uploads.read_file(&filename) {
        Some((data, content_type)) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                content_type
                    .parse()
                    .unwrap_or_else(|_| "application/octet-stream".parse().unwrap()),
            );
            // Cache for 1 year — content-hash filenames never change
            headers.insert(
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".parse().unwrap(),
            );

            (StatusCode::OK, headers, Body::from(data)).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
