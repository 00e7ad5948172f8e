// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use fuzzysheets_model::{ArtifactDescriptor, OperationKind, ValidatedInput};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::{BackendError, OperationBackend, RunContext};

/// One recorded call to [`FakeBackend::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub kind: OperationKind,
    pub inputs: Vec<ValidatedInput>,
    pub ctx: RunContext,
}

/// Scripted backend for tests: writes `artifacts` into the output directory
/// or fails with `fail_with`.
pub struct FakeBackend {
    pub artifacts: Mutex<Vec<String>>,
    pub fail_with: Mutex<Option<String>>,
    pub calls: Mutex<Vec<RecordedRun>>,
    pub run_calls: AtomicU64,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::with_artifacts(&["result.csv"])
    }
}

impl FakeBackend {
    #[must_use]
    pub fn with_artifacts(names: &[&str]) -> Self {
        Self {
            artifacts: Mutex::new(names.iter().map(ToString::to_string).collect()),
            fail_with: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            run_calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Mutex::new(Some(message.to_string())),
            ..Self::with_artifacts(&[])
        }
    }
}

#[async_trait]
impl OperationBackend for FakeBackend {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn run(
        &self,
        kind: OperationKind,
        inputs: &[ValidatedInput],
        ctx: &RunContext,
    ) -> Result<Vec<ArtifactDescriptor>, BackendError> {
        self.run_calls.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().await.push(RecordedRun {
            kind,
            inputs: inputs.to_vec(),
            ctx: ctx.clone(),
        });
        if let Some(message) = self.fail_with.lock().await.clone() {
            return Err(BackendError(message));
        }
        let names = self.artifacts.lock().await.clone();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            tokio::fs::write(ctx.output_dir.join(&name), format!("{kind}\n"))
                .await
                .map_err(|e| BackendError(format!("write {name}: {e}")))?;
            out.push(ctx.artifact(&name)?);
        }
        Ok(out)
    }
}
