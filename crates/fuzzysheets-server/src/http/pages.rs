// SPDX-License-Identifier: Apache-2.0

use askama::Template;
use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::{Extension, Json};
use fuzzysheets_model::OperationKind;
use serde_json::{json, Value};

use super::errors::AppError;
use crate::session::SessionHandle;
use crate::{AppState, CRATE_NAME};

pub(crate) struct DownloadLink {
    pub href: String,
    pub filename: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    gate: bool,
    flashes: Vec<String>,
}

#[derive(Template)]
#[template(path = "operation.html")]
struct OperationTemplate<'a> {
    gate: bool,
    flashes: Vec<String>,
    kind: &'a str,
    paired: bool,
    default_rows: usize,
    downloads: Vec<DownloadLink>,
}

#[derive(Template)]
#[template(path = "generate.html")]
struct GenerateTemplate {
    gate: bool,
    flashes: Vec<String>,
    default_rows: usize,
    max_rows: usize,
}

pub(crate) fn render_html<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    page.render()
        .map(Html)
        .map_err(|e| AppError::internal(format!("page rendering failed: {e}")))
}

pub(crate) async fn index_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Html<String>, AppError> {
    render_html(&IndexTemplate {
        gate: state.gate_enabled(),
        flashes: session.take_flashes(),
    })
}

pub(crate) async fn detect_page_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Html<String>, AppError> {
    operation_page(&state, &session, OperationKind::Detect)
}

pub(crate) async fn merge_page_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Html<String>, AppError> {
    operation_page(&state, &session, OperationKind::Merge)
}

/// Shows the form with pending flashes and the last results. The links are
/// taken out of the registry so a reload shows a clean form.
fn operation_page(
    state: &AppState,
    session: &SessionHandle,
    kind: OperationKind,
) -> Result<Html<String>, AppError> {
    let downloads = state
        .registry
        .take(session.id())
        .into_iter()
        .map(|artifact| DownloadLink {
            href: artifact.download_href(),
            filename: artifact.filename,
        })
        .collect();
    render_html(&OperationTemplate {
        gate: state.gate_enabled(),
        flashes: session.take_flashes(),
        kind: kind.as_str(),
        paired: kind.is_paired(),
        default_rows: state.config.default_rows,
        downloads,
    })
}

pub(crate) async fn generate_form_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Html<String>, AppError> {
    render_html(&GenerateTemplate {
        gate: state.gate_enabled(),
        flashes: session.take_flashes(),
        default_rows: state.config.default_rows,
        max_rows: state.config.max_rows,
    })
}

pub(crate) async fn redirect_home() -> Redirect {
    Redirect::to("/")
}

pub(crate) async fn healthz_handler() -> Json<Value> {
    Json(json!({ "ok": true, "service": CRATE_NAME }))
}
