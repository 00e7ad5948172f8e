// SPDX-License-Identifier: Apache-2.0

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use fuzzysheets_ingest::{evaluate, materialize, IngestError, Rejection, RequestPrefix, Verdict};
use fuzzysheets_model::OperationKind;
use tracing::{info, warn};

use super::errors::AppError;
use super::resolver::{resolve_slots, SubmissionForm};
use crate::config::ServerConfig;
use crate::session::SessionHandle;
use crate::AppState;

/// Row count from the `q` field, or the configured default when it is
/// missing or blank.
pub(crate) fn requested_rows(q: Option<&str>, cfg: &ServerConfig) -> Result<usize, AppError> {
    let Some(raw) = q.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(cfg.default_rows);
    };
    match raw.parse::<usize>() {
        Ok(rows) if (1..=cfg.max_rows).contains(&rows) => Ok(rows),
        _ => Err(AppError::bad_request(format!(
            "The number of rows must be a whole number between 1 and {}.",
            cfg.max_rows
        ))),
    }
}

/// Input resolution and dispatch for `POST /upload/:kind`.
pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(kind): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let kind = OperationKind::parse(&kind).map_err(|_| AppError::not_found())?;
    state.registry.clear(session.id());

    let multipart = multipart.map_err(|r| AppError::new(r.status(), r.body_text()))?;
    let form = SubmissionForm::from_multipart(multipart).await?;
    let slots = resolve_slots(kind, &form);

    let artifacts = match evaluate(kind, &slots) {
        Verdict::Reject(rejection) => return Ok(reject(&session, kind, &rejection)),
        Verdict::Generate => {
            let rows = requested_rows(form.field("q"), &state.config)?;
            state.dispatcher.generate(kind, rows).await?
        }
        Verdict::Accept => {
            let layout = state.layout.clone();
            let prefix = RequestPrefix::generate(kind);
            let stored = tokio::task::spawn_blocking(move || materialize(&slots, &layout, &prefix))
                .await
                .map_err(|e| AppError::internal(format!("input storage task failed: {e}")))?;
            let inputs = match stored {
                Ok(inputs) => inputs,
                Err(IngestError::Rejected(rejection)) => {
                    return Ok(reject(&session, kind, &rejection))
                }
                Err(e @ IngestError::Storage(_)) => {
                    warn!(%kind, error = %e, "input storage failed");
                    return Err(AppError::internal(e.to_string()));
                }
            };
            state.dispatcher.transform(kind, &inputs).await?
        }
    };

    info!(%kind, artifacts = artifacts.len(), session = %session.id(), "submission completed");
    state.registry.set(session.id(), artifacts);
    Ok(Redirect::to(kind.results_path()).into_response())
}

fn reject(session: &SessionHandle, kind: OperationKind, rejection: &Rejection) -> Response {
    info!(%kind, rule = rejection.rule(), reason = %rejection, "submission rejected");
    session.flash(rejection.to_string());
    Redirect::to(kind.results_path()).into_response()
}
