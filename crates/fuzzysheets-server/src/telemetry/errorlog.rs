// SPDX-License-Identifier: Apache-2.0

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::http::errors::ErrorReport;

pub const ERRORLOG_TARGET: &str = "fuzzysheets_errorlog";

/// Request fields captured before the request is handed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub base_url: String,
    pub url: String,
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: String,
}

/// One line of the error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub date: String,
    pub base_url: String,
    pub endpoint: Option<String>,
    pub path: String,
    pub referrer: Option<String>,
    pub url: String,
    pub user_agent: String,
    pub code: u16,
    pub description: String,
    pub name: String,
}

impl ErrorRecord {
    #[must_use]
    pub fn new(context: RequestContext, endpoint: Option<String>, report: &ErrorReport) -> Self {
        Self {
            date: Local::now().format("%d.%m.%Y %H:%M:%S").to_string(),
            base_url: context.base_url,
            endpoint,
            path: context.path,
            referrer: context.referrer,
            url: context.url,
            user_agent: context.user_agent,
            code: report.code,
            description: report.description.clone(),
            name: report.name.clone(),
        }
    }
}

/// Process-wide error log: every record becomes a tracing event and, when a
/// file is configured, a JSON line appended to it.
pub struct ErrorLog {
    path: Option<PathBuf>,
    file_lock: Mutex<()>,
}

impl ErrorLog {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            file_lock: Mutex::new(()),
        }
    }

    /// Never fails the request it describes; write problems are only logged.
    pub async fn record(&self, record: &ErrorRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                warn!("error record serialization failed: {e}");
                return;
            }
        };
        error!(
            target: ERRORLOG_TARGET,
            code = record.code,
            name = %record.name,
            path = %record.path,
            endpoint = record.endpoint.as_deref().unwrap_or(""),
            description = %record.description,
            "request failed"
        );
        let Some(path) = &self.path else {
            return;
        };
        let _guard = self.file_lock.lock().await;
        if let Err(e) = append_line(path, &line).await {
            warn!(path = %path.display(), "error log write failed: {e}");
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}
