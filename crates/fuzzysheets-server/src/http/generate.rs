// SPDX-License-Identifier: Apache-2.0

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Form;
use flate2::write::GzEncoder;
use flate2::Compression;
use fuzzysheets_model::{ArtifactDescriptor, OperationKind};
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use super::downloads::file_response;
use super::errors::AppError;
use super::upload::requested_rows;
use crate::dispatch::GENERATED_FILE;
use crate::AppState;

pub const GENERATED_ARCHIVE: &str = "generated_spreadsheets.tar.gz";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateForm {
    detect: Option<String>,
    merge: Option<String>,
    q: Option<String>,
}

impl GenerateForm {
    fn kind(&self) -> Option<OperationKind> {
        let pressed = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if pressed(&self.detect) {
            Some(OperationKind::Detect)
        } else if pressed(&self.merge) {
            Some(OperationKind::Merge)
        } else {
            None
        }
    }
}

/// `POST /generate`: fresh synthetic data sent back as an attachment.
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    form: Result<Form<GenerateForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|r| AppError::new(r.status(), r.body_text()))?;
    let kind = form
        .kind()
        .ok_or_else(|| AppError::bad_request("Choose either 'detect' or 'merge'."))?;
    let rows = requested_rows(form.q.as_deref(), &state.config)?;

    let artifacts = state.dispatcher.generate(kind, rows).await?;
    let root = state.dispatcher.download_root().to_path_buf();
    let (path, filename) = match kind {
        OperationKind::Detect => {
            let first = artifacts
                .first()
                .ok_or_else(|| AppError::internal("generation produced no file"))?;
            (first.resolve(&root), GENERATED_FILE)
        }
        OperationKind::Merge => {
            let archive = tokio::task::spawn_blocking(move || package(&root, &artifacts))
                .await
                .map_err(|e| AppError::internal(format!("packaging task failed: {e}")))?
                .map_err(|e| AppError::internal(format!("packaging failed: {e}")))?;
            (archive, GENERATED_ARCHIVE)
        }
    };
    info!(%kind, rows, file = %path.display(), "sending generated data");
    file_response(&path, filename, true).await
}

/// Packs the artifacts into one gzip'd tarball next to them and removes the
/// loose files.
fn package(root: &Path, artifacts: &[ArtifactDescriptor]) -> std::io::Result<PathBuf> {
    let first = artifacts
        .first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "nothing to package"))?;
    let archive = root.join(first.directory()).join(GENERATED_ARCHIVE);
    let encoder = GzEncoder::new(File::create(&archive)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for artifact in artifacts {
        builder.append_path_with_name(artifact.resolve(root), &artifact.filename)?;
    }
    builder.into_inner()?.finish()?;
    for artifact in artifacts {
        fs::remove_file(artifact.resolve(root))?;
    }
    Ok(archive)
}
