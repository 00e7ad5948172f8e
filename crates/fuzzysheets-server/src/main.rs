// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use fuzzysheets_server::{
    build_router, validate_startup_config_contract, AppState, CommandBackend, ExactMatchBackend,
    OperationBackend, ServerConfig, SyntheticGenerator, CONFIG_SCHEMA_VERSION,
};
#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider as _;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn config_from_env() -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        upload_dir: env_path("FUZZY_UPLOAD_DIR", "uploads"),
        download_dir: env_path("FUZZY_DOWNLOAD_DIR", "downloads"),
        server_files_root: env_path("FUZZY_SERVER_FILES_ROOT", "server_files"),
        max_body_bytes: env_usize("FUZZY_MAX_BODY_BYTES", defaults.max_body_bytes),
        access_token: env::var("FUZZY_TOKEN").ok(),
        session_idle_ttl: Duration::from_secs(env_u64(
            "FUZZY_SESSION_IDLE_TTL_SECS",
            defaults.session_idle_ttl.as_secs(),
        )),
        session_sweep_interval: env_duration_ms("FUZZY_SESSION_SWEEP_MS", 60_000),
        default_rows: env_usize("FUZZY_DEFAULT_ROWS", defaults.default_rows),
        max_rows: env_usize("FUZZY_MAX_ROWS", defaults.max_rows),
        errorlog_path: match env::var("FUZZY_ERRORLOG") {
            Ok(v) if v.is_empty() => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => defaults.errorlog_path,
        },
        enable_audit_log: env_bool("FUZZY_ENABLE_AUDIT_LOG", false),
    }
}

fn backend_from_env() -> Arc<dyn OperationBackend> {
    match env::var("FUZZY_BACKEND_CMD") {
        Ok(program) if !program.trim().is_empty() => {
            let args = env::var("FUZZY_BACKEND_ARGS")
                .unwrap_or_default()
                .split_whitespace()
                .map(ToString::to_string)
                .collect();
            Arc::new(CommandBackend::new(program, args))
        }
        _ => Arc::new(ExactMatchBackend),
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(feature = "otel")]
fn init_otel_tracing(log_json: bool) -> Result<(), String> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .build()
        .map_err(|e| format!("otlp exporter: {e}"))?;
    let tracer = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build()
        .tracer("fuzzysheets-server");
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().json())
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    }
    Ok(())
}

#[cfg(not(feature = "otel"))]
fn init_otel_tracing(_log_json: bool) -> Result<(), String> {
    Err("FUZZY_OTEL_ENABLED=true needs a build with the `otel` feature".to_string())
}

fn init_tracing() -> Result<(), String> {
    let log_json = env_bool("FUZZY_LOG_JSON", true);
    if env_bool("FUZZY_OTEL_ENABLED", false) {
        return init_otel_tracing(log_json);
    }
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing()?;

    let bind_addr = env::var("FUZZY_BIND").unwrap_or_else(|_| "0.0.0.0:8086".to_string());
    let cfg = config_from_env();
    validate_startup_config_contract(&cfg)?;
    for dir in [&cfg.upload_dir, &cfg.download_dir] {
        std::fs::create_dir_all(dir).map_err(|e| format!("create {}: {e}", dir.display()))?;
    }
    let config_json = serde_json::to_string(&cfg).map_err(|e| format!("config json: {e}"))?;
    info!(
        schema = CONFIG_SCHEMA_VERSION,
        config = %config_json,
        gate = cfg.access_token.is_some(),
        "effective configuration"
    );

    let backend = backend_from_env();
    info!(backend = backend.backend_tag(), "operation backend selected");
    let generator = Arc::new(SyntheticGenerator::new(cfg.max_rows));
    let state = AppState::new(cfg, backend, generator);
    state.spawn_background_tasks();
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("fuzzysheets-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            let drain_ms = env_u64("FUZZY_SHUTDOWN_DRAIN_MS", 2000);
            info!(drain_ms, "shutdown requested, draining");
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
