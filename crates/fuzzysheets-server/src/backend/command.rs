// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use fuzzysheets_model::{ArtifactDescriptor, OperationKind, ValidatedInput};
use tokio::process::Command;
use tracing::{info, warn};

use super::{BackendError, OperationBackend, RunContext};

/// Delegates to an external program:
/// `<program> <args…> <kind> <output_dir> <inputs…>`.
///
/// Every regular file the program leaves in the output directory becomes an
/// artifact, in file-name order.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl OperationBackend for CommandBackend {
    fn backend_tag(&self) -> &'static str {
        "command"
    }

    async fn run(
        &self,
        kind: OperationKind,
        inputs: &[ValidatedInput],
        ctx: &RunContext,
    ) -> Result<Vec<ArtifactDescriptor>, BackendError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(kind.as_str())
            .arg(&ctx.output_dir)
            .args(inputs.iter().map(|i| &i.path))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BackendError(format!("spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(program = %self.program, status = %output.status, "backend command failed");
            return Err(BackendError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&ctx.output_dir)
            .await
            .map_err(|e| BackendError(format!("list {}: {e}", ctx.output_dir.display())))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackendError(format!("list {}: {e}", ctx.output_dir.display())))?
        {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(BackendError(format!(
                "{} produced no output in {}",
                self.program,
                ctx.output_dir.display()
            )));
        }
        names.sort();
        info!(program = %self.program, %kind, artifacts = names.len(), "backend command finished");
        names.iter().map(|name| ctx.artifact(name)).collect()
    }
}
