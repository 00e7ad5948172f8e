// SPDX-License-Identifier: Apache-2.0

use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::header::{HOST, REFERER, USER_AGENT};
use axum::http::{HeaderName, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::http::errors::ErrorReport;
use crate::telemetry::errorlog::{ErrorRecord, RequestContext};
use crate::AppState;

/// Copies the matched route template onto the response so outer layers,
/// which run before routing, can still see it.
pub(crate) async fn expose_matched_path(
    matched: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if let Some(matched) = matched {
        response.extensions_mut().insert(matched);
    }
    response
}

/// Records every apology response in the error log.
pub(crate) async fn error_log_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let context = capture(&request);
    let response = next.run(request).await;
    if let Some(report) = response.extensions().get::<ErrorReport>() {
        let endpoint = response
            .extensions()
            .get::<MatchedPath>()
            .map(|m| m.as_str().to_string());
        let record = ErrorRecord::new(context, endpoint, report);
        state.errorlog.record(&record).await;
    }
    response
}

fn capture(request: &Request<Body>) -> RequestContext {
    let header = |name: HeaderName| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let host = header(HOST).unwrap_or_else(|| "localhost".to_string());
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());
    RequestContext {
        base_url: format!("http://{host}{path}"),
        url: format!("http://{host}{path_and_query}"),
        path,
        referrer: header(REFERER),
        user_agent: header(USER_AGENT).unwrap_or_default(),
    }
}
