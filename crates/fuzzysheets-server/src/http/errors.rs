// SPDX-License-Identifier: Apache-2.0

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::any::Any;
use std::fmt::{Display, Formatter};
use tracing::error;

use crate::dispatch::DispatchError;

pub const NOT_FOUND_DESCRIPTION: &str = "The requested URL was not found on the server. If you entered the URL manually please check your spelling and try again.";
pub const INTERNAL_DESCRIPTION: &str = "The server encountered an internal error and was unable to complete your request. Either the server is overloaded or there is an error in the application.";

/// A request that ends on the apology page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub status: StatusCode,
    pub description: String,
}

impl AppError {
    #[must_use]
    pub fn new(status: StatusCode, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn bad_request(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, description)
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND_DESCRIPTION)
    }

    #[must_use]
    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, description)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Error")
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.name(), self.description)
    }
}

impl std::error::Error for AppError {}

impl From<DispatchError> for AppError {
    fn from(value: DispatchError) -> Self {
        Self::internal(value.to_string())
    }
}

/// Attached to every apology response so the error log can pick it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub code: u16,
    pub name: String,
    pub description: String,
}

#[derive(Template)]
#[template(path = "apology.html")]
struct ApologyTemplate<'a> {
    code: u16,
    name: &'a str,
    description: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = ErrorReport {
            code: self.status.as_u16(),
            name: self.name().to_string(),
            description: self.description,
        };
        let page = ApologyTemplate {
            code: report.code,
            name: &report.name,
            description: &report.description,
        };
        let mut response = match page.render() {
            Ok(body) => (self.status, Html(body)).into_response(),
            Err(e) => {
                error!("apology page rendering failed: {e}");
                (self.status, format!("{} {}", report.code, report.name)).into_response()
            }
        };
        response.extensions_mut().insert(report);
        response
    }
}

/// Turns a caught handler panic into the 500 apology page.
pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = detail, "request handler panicked");
    AppError::internal(INTERNAL_DESCRIPTION).into_response()
}

pub(crate) async fn not_found_handler() -> AppError {
    AppError::not_found()
}
