// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use fuzzysheets_model::{ArtifactDescriptor, OperationKind, ValidatedInput};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

mod command;
mod exact;
pub mod fake;
mod synthetic;

pub use command::CommandBackend;
pub use exact::ExactMatchBackend;
pub use synthetic::SyntheticGenerator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError(pub String);

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// Where one backend invocation writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Name of the output directory under the download root.
    pub directory: String,
    /// Absolute location of that directory.
    pub output_dir: PathBuf,
}

impl RunContext {
    /// Descriptor for `filename` inside this run's output directory.
    pub fn artifact(&self, filename: &str) -> Result<ArtifactDescriptor, BackendError> {
        ArtifactDescriptor::new(&self.directory, filename).map_err(|e| BackendError(e.to_string()))
    }
}

/// Runs a named operation over validated inputs.
///
/// Implementations are all-or-nothing: either every returned artifact was
/// written into `ctx.output_dir`, or an error is returned.
#[async_trait]
pub trait OperationBackend: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn run(
        &self,
        kind: OperationKind,
        inputs: &[ValidatedInput],
        ctx: &RunContext,
    ) -> Result<Vec<ArtifactDescriptor>, BackendError>;
}

/// Produces synthetic spreadsheets. Calls block on file I/O.
pub trait SheetGenerator: Send + Sync {
    fn generate(&self, rows: usize, dir: &Path, filename: &str) -> Result<PathBuf, BackendError>;

    fn generate_two(
        &self,
        rows: usize,
        dir: &Path,
        filenames: [&str; 2],
    ) -> Result<(PathBuf, PathBuf), BackendError>;
}
