// SPDX-License-Identifier: Apache-2.0

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::session::SessionHandle;
use crate::AppState;

/// Admits a session that already passed, or that presents the token as
/// `?token=`; everyone else is sent to the login page.
pub(crate) async fn access_gate_middleware(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.access_token.as_deref() else {
        return next.run(request).await;
    };
    if session.is_admitted() {
        return next.run(request).await;
    }

    let presented = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(params)| params.get("token").cloned());
    if presented.as_deref() == Some(expected) {
        session.admit();
        info!(session = %session.id(), "session admitted by query token");
        return next.run(request).await;
    }

    let original = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    debug!(path = %original, "unadmitted session redirected to login");
    Redirect::to(&format!("/login?next={}", urlencoding::encode(original))).into_response()
}
