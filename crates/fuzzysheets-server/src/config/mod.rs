// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
    pub server_files_root: PathBuf,
    pub max_body_bytes: usize,
    /// Shared access token; `None` disables the access gate.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub session_idle_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub default_rows: usize,
    pub max_rows: usize,
    pub errorlog_path: Option<PathBuf>,
    pub enable_audit_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            download_dir: PathBuf::from("downloads"),
            server_files_root: PathBuf::from("server_files"),
            max_body_bytes: 10 * 1024 * 1024,
            access_token: None,
            session_idle_ttl: Duration::from_secs(12 * 60 * 60),
            session_sweep_interval: Duration::from_secs(60),
            default_rows: 100,
            max_rows: 100_000,
            errorlog_path: Some(PathBuf::from("errorlog.jsonl")),
            enable_audit_log: false,
        }
    }
}

pub fn validate_startup_config_contract(cfg: &ServerConfig) -> Result<(), String> {
    if cfg.max_body_bytes == 0 {
        return Err("max body bytes must be > 0".to_string());
    }
    if cfg.default_rows == 0 || cfg.default_rows > cfg.max_rows {
        return Err(format!(
            "default rows must be in 1..={} (got {})",
            cfg.max_rows, cfg.default_rows
        ));
    }
    if cfg.upload_dir == cfg.download_dir {
        return Err("upload and download directories must differ".to_string());
    }
    if cfg.access_token.as_deref().is_some_and(str::is_empty) {
        return Err("a configured access token must be non-empty".to_string());
    }
    if cfg.session_idle_ttl.is_zero() || cfg.session_sweep_interval.is_zero() {
        return Err("session durations must be > 0".to_string());
    }
    Ok(())
}
