// SPDX-License-Identifier: Apache-2.0

use chrono::Local;
use fuzzysheets_ingest::{output_directory_name, random_token};
use fuzzysheets_model::{ArtifactDescriptor, OperationKind, ValidatedInput};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::backend::{BackendError, OperationBackend, RunContext, SheetGenerator};

pub const GENERATED_FILE: &str = "generated_spreadsheet.csv";
pub const GENERATED_PAIR: [&str; 2] = ["generated_spreadsheet1.csv", "generated_spreadsheet2.csv"];
const GENERATE_LABEL: &str = "generate";

#[derive(Debug)]
pub enum DispatchError {
    Storage(String),
    Generation(BackendError),
    Backend(BackendError),
    InvalidArtifact(String),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(m) => write!(f, "output storage failed: {m}"),
            Self::Generation(e) => write!(f, "spreadsheet generation failed: {e}"),
            Self::Backend(e) => write!(f, "backend operation failed: {e}"),
            Self::InvalidArtifact(m) => write!(f, "backend returned an invalid artifact: {m}"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Invokes the generator or the operation backend exactly once per request
/// and hands back only artifacts that exist under the download root.
#[derive(Clone)]
pub struct OperationDispatcher {
    download_root: PathBuf,
    backend: Arc<dyn OperationBackend>,
    generator: Arc<dyn SheetGenerator>,
}

impl OperationDispatcher {
    #[must_use]
    pub fn new(
        download_root: impl Into<PathBuf>,
        backend: Arc<dyn OperationBackend>,
        generator: Arc<dyn SheetGenerator>,
    ) -> Self {
        Self {
            download_root: download_root.into(),
            backend,
            generator,
        }
    }

    #[must_use]
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// No-input mode: fresh synthetic spreadsheet(s) for `kind`.
    pub async fn generate(
        &self,
        kind: OperationKind,
        rows: usize,
    ) -> Result<Vec<ArtifactDescriptor>, DispatchError> {
        let ctx = self.create_output_dir(GENERATE_LABEL).await?;
        let generator = Arc::clone(&self.generator);
        let dir = ctx.output_dir.clone();
        let names: Vec<&'static str> = match kind {
            OperationKind::Detect => vec![GENERATED_FILE],
            OperationKind::Merge => GENERATED_PAIR.to_vec(),
        };
        tokio::task::spawn_blocking(move || match kind {
            OperationKind::Detect => generator.generate(rows, &dir, GENERATED_FILE).map(|_| ()),
            OperationKind::Merge => generator.generate_two(rows, &dir, GENERATED_PAIR).map(|_| ()),
        })
        .await
        .map_err(|e| DispatchError::Storage(format!("generation task failed: {e}")))?
        .map_err(|e| {
            error!(%kind, rows, error = %e, "generation failed");
            DispatchError::Generation(e)
        })?;

        let artifacts = names
            .into_iter()
            .map(|name| ctx.artifact(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(DispatchError::Generation)?;
        self.verify(&artifacts).await?;
        info!(%kind, rows, directory = %ctx.directory, "generated inputs");
        Ok(artifacts)
    }

    /// Transform mode: runs the backend over the validated inputs.
    pub async fn transform(
        &self,
        kind: OperationKind,
        inputs: &[ValidatedInput],
    ) -> Result<Vec<ArtifactDescriptor>, DispatchError> {
        let ctx = self.create_output_dir(kind.as_str()).await?;
        let artifacts = self.backend.run(kind, inputs, &ctx).await.map_err(|e| {
            error!(
                %kind,
                backend = self.backend.backend_tag(),
                error = %e,
                "backend operation failed"
            );
            DispatchError::Backend(e)
        })?;
        if let Some(stray) = artifacts.iter().find(|a| a.directory() != ctx.directory) {
            return Err(DispatchError::InvalidArtifact(format!(
                "{} is outside run directory {}",
                stray.path, ctx.directory
            )));
        }
        self.verify(&artifacts).await?;
        info!(
            %kind,
            backend = self.backend.backend_tag(),
            inputs = inputs.len(),
            artifacts = artifacts.len(),
            directory = %ctx.directory,
            "operation dispatched"
        );
        Ok(artifacts)
    }

    async fn create_output_dir(&self, label: &str) -> Result<RunContext, DispatchError> {
        tokio::fs::create_dir_all(&self.download_root)
            .await
            .map_err(|e| DispatchError::Storage(format!("create download root: {e}")))?;
        let directory = output_directory_name(label, Local::now().naive_local(), &random_token());
        let output_dir = self.download_root.join(&directory);
        tokio::fs::create_dir(&output_dir)
            .await
            .map_err(|e| DispatchError::Storage(format!("create {}: {e}", output_dir.display())))?;
        Ok(RunContext {
            directory,
            output_dir,
        })
    }

    async fn verify(&self, artifacts: &[ArtifactDescriptor]) -> Result<(), DispatchError> {
        let root = tokio::fs::canonicalize(&self.download_root)
            .await
            .map_err(|e| DispatchError::Storage(format!("resolve download root: {e}")))?;
        for artifact in artifacts {
            ArtifactDescriptor::check_download_segments(artifact.directory(), &artifact.filename)
                .map_err(|e| DispatchError::InvalidArtifact(e.to_string()))?;
            let missing = || DispatchError::InvalidArtifact(format!("{} does not exist", artifact.path));
            let resolved = tokio::fs::canonicalize(artifact.resolve(&self.download_root))
                .await
                .map_err(|_| missing())?;
            if !resolved.starts_with(&root) {
                return Err(DispatchError::InvalidArtifact(format!(
                    "{} resolves outside the download root",
                    artifact.path
                )));
            }
            let meta = tokio::fs::metadata(&resolved).await.map_err(|_| missing())?;
            if !meta.is_file() {
                return Err(missing());
            }
        }
        Ok(())
    }
}
