// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response};
use axum::Router;
use fuzzysheets_server::{
    build_router, AppState, FakeBackend, ServerConfig, SyntheticGenerator, SESSION_COOKIE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "fuzzysheets-test-boundary";

pub struct Harness {
    pub tmp: TempDir,
    pub backend: Arc<FakeBackend>,
    pub router: Router,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with_config(backend, |_| {})
    }

    pub fn with_config(backend: FakeBackend, tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut cfg = ServerConfig {
            upload_dir: tmp.path().join("uploads"),
            download_dir: tmp.path().join("downloads"),
            server_files_root: tmp.path().join("shared"),
            errorlog_path: Some(tmp.path().join("errorlog.jsonl")),
            ..ServerConfig::default()
        };
        tweak(&mut cfg);
        std::fs::create_dir_all(&cfg.server_files_root).expect("shared dir");
        let backend = Arc::new(backend);
        let state = AppState::new(
            cfg,
            backend.clone(),
            Arc::new(SyntheticGenerator::new(1_000).with_seed(7)),
        );
        Self {
            tmp,
            backend,
            router: build_router(state),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub fn errorlog_lines(&self) -> Vec<serde_json::Value> {
        std::fs::read_to_string(self.path("errorlog.jsonl"))
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }
}

pub enum Part<'a> {
    File(&'a str, &'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File(field, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text(field, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(kind: &str, cookie: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::post(format!("/upload/{kind}")).header(
        CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder
        .body(Body::from(multipart_body(parts)))
        .expect("request")
}

pub fn form_request(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder =
        Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

/// `name=value` pair from the session cookie the response hands out.
pub fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf8 body")
}

/// Regular files under `dir`, relative to it, sorted.
pub fn files_under(dir: &std::path::Path) -> Vec<String> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            out.extend(files_under(&path).into_iter().map(|f| format!("{name}/{f}")));
        } else {
            out.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    out.sort();
    out
}
