// SPDX-License-Identifier: Apache-2.0

use askama::Template;
use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;
use tracing::{info, warn};

use super::errors::AppError;
use super::pages::render_html;
use crate::session::SessionHandle;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginForm {
    token: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    gate: bool,
    flashes: Vec<String>,
    next: String,
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\") => n,
        _ => "/",
    }
}

fn login_page(
    state: &AppState,
    session: &SessionHandle,
    next: Option<&str>,
) -> Result<Response, AppError> {
    let page = LoginTemplate {
        gate: state.gate_enabled(),
        flashes: session.take_flashes(),
        next: urlencoding::encode(safe_next(next)).into_owned(),
    };
    Ok(render_html(&page)?.into_response())
}

pub(crate) async fn login_page_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    login_page(&state, &session, query.next.as_deref())
}

pub(crate) async fn login_submit_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<LoginQuery>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|r| AppError::new(r.status(), r.body_text()))?;
    let accepted = match state.config.access_token.as_deref() {
        None => true,
        Some(expected) => form.token.as_deref() == Some(expected),
    };
    if accepted {
        session.admit();
        info!(session = %session.id(), "session admitted by login");
        return Ok(Redirect::to(safe_next(query.next.as_deref())).into_response());
    }
    warn!(session = %session.id(), "login with invalid token");
    session.flash("Invalid token");
    login_page(&state, &session, query.next.as_deref())
}

pub(crate) async fn logout_handler(Extension(session): Extension<SessionHandle>) -> Redirect {
    session.end();
    Redirect::to("/login")
}
