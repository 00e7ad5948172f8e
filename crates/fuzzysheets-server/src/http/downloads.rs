// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use fuzzysheets_model::ArtifactDescriptor;
use tracing::debug;

use super::errors::AppError;
use crate::AppState;

/// `GET|POST /downloads/:directory/:filename`.
///
/// Anything that does not resolve to a regular file under the download root
/// is reported as missing.
pub(crate) async fn download_handler(
    State(state): State<AppState>,
    Path((directory, filename)): Path<(String, String)>,
) -> Result<Response, AppError> {
    ArtifactDescriptor::check_download_segments(&directory, &filename)
        .map_err(|_| AppError::not_found())?;
    let root = tokio::fs::canonicalize(state.dispatcher.download_root())
        .await
        .map_err(|_| AppError::not_found())?;
    let candidate = tokio::fs::canonicalize(root.join(&directory).join(&filename))
        .await
        .map_err(|_| AppError::not_found())?;
    if !candidate.starts_with(&root) {
        debug!(%directory, %filename, "download outside root refused");
        return Err(AppError::not_found());
    }
    file_response(&candidate, &filename, false).await
}

pub(crate) async fn file_response(
    path: &std::path::Path,
    filename: &str,
    attachment: bool,
) -> Result<Response, AppError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| AppError::not_found())?;
    if !meta.is_file() {
        return Err(AppError::not_found());
    }
    let body = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::internal(format!("read {}: {e}", path.display())))?;
    let mime = mime_guess::from_path(filename).first_or_octet_stream();
    let mut response = (StatusCode::OK, body).into_response();
    if let Ok(value) = HeaderValue::from_str(mime.essence_str()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    if attachment {
        let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response.headers_mut().insert(CONTENT_DISPOSITION, value);
        }
    }
    Ok(response)
}
