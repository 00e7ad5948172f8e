// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use fuzzysheets_ingest::StorageLayout;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

mod backend;
mod config;
mod dispatch;
mod http;
mod middleware;
mod registry;
mod session;
mod telemetry;

pub const CRATE_NAME: &str = "fuzzysheets-server";

pub use backend::fake::{FakeBackend, RecordedRun};
pub use backend::{
    BackendError, CommandBackend, ExactMatchBackend, OperationBackend, RunContext, SheetGenerator,
    SyntheticGenerator,
};
pub use config::{validate_startup_config_contract, ServerConfig, CONFIG_SCHEMA_VERSION};
pub use dispatch::{DispatchError, OperationDispatcher, GENERATED_FILE, GENERATED_PAIR};
pub use http::errors::{AppError, ErrorReport};
pub use http::generate::GENERATED_ARCHIVE;
pub use http::resolver::{resolve_slots, SubmissionForm};
pub use registry::SessionArtifactRegistry;
pub use session::{SessionHandle, SessionId, SessionState, SessionStore, SESSION_COOKIE};
pub use telemetry::errorlog::{ErrorLog, ErrorRecord, RequestContext, ERRORLOG_TARGET};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<SessionStore>,
    pub registry: SessionArtifactRegistry,
    pub dispatcher: OperationDispatcher,
    pub layout: StorageLayout,
    pub errorlog: Arc<ErrorLog>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: ServerConfig,
        backend: Arc<dyn OperationBackend>,
        generator: Arc<dyn SheetGenerator>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_idle_ttl));
        Self {
            registry: SessionArtifactRegistry::new(Arc::clone(&sessions)),
            dispatcher: OperationDispatcher::new(&config.download_dir, backend, generator),
            layout: StorageLayout::new(&config.upload_dir, &config.server_files_root),
            errorlog: Arc::new(ErrorLog::new(config.errorlog_path.clone())),
            sessions,
            request_id_seed: Arc::new(AtomicU64::new(1)),
            config: Arc::new(config),
        }
    }

    /// Built-in backends: exact matching and the synthetic generator.
    #[must_use]
    pub fn with_builtin_backends(config: ServerConfig) -> Self {
        let generator = Arc::new(SyntheticGenerator::new(config.max_rows));
        Self::new(config, Arc::new(ExactMatchBackend), generator)
    }

    #[must_use]
    pub fn gate_enabled(&self) -> bool {
        self.config.access_token.is_some()
    }

    pub fn spawn_background_tasks(&self) {
        self.sessions
            .spawn_background_tasks(self.config.session_sweep_interval);
    }
}

pub fn build_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/", get(http::pages::index_handler))
        .route("/detect", get(http::pages::detect_page_handler))
        .route("/merge", get(http::pages::merge_page_handler))
        .route(
            "/upload",
            get(http::pages::redirect_home).post(http::pages::redirect_home),
        )
        .route(
            "/upload/:kind",
            get(http::pages::redirect_home).post(http::upload::upload_handler),
        )
        .route(
            "/generate",
            get(http::pages::generate_form_handler).post(http::generate::generate_handler),
        )
        .route(
            "/downloads/:directory/:filename",
            get(http::downloads::download_handler).post(http::downloads::download_handler),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::access_gate::access_gate_middleware,
        ));

    let public = Router::new()
        .route(
            "/login",
            get(http::auth::login_page_handler).post(http::auth::login_submit_handler),
        )
        .route("/logout", get(http::auth::logout_handler))
        .route("/healthz", get(http::pages::healthz_handler));

    gated
        .merge(public)
        .route_layer(from_fn(middleware::error_log::expose_matched_path))
        .fallback(http::errors::not_found_handler)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session::session_middleware,
        ))
        .layer(CatchPanicLayer::custom(http::errors::panic_response))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::error_log::error_log_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
