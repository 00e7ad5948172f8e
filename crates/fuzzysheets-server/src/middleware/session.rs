// SPDX-License-Identifier: Apache-2.0

use axum::body::Body;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::session::{session_cookie, set_cookie_value, SessionHandle};
use crate::AppState;

/// Attaches a [`SessionHandle`] to every request and hands out a cookie when
/// a new session was opened.
pub(crate) async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let presented = session_cookie(request.headers());
    let (id, created) = state.sessions.open(presented.as_deref());
    request
        .extensions_mut()
        .insert(SessionHandle::new(id.clone(), Arc::clone(&state.sessions)));

    let mut response = next.run(request).await;
    if created {
        if let Ok(value) = HeaderValue::from_str(&set_cookie_value(&id)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}
