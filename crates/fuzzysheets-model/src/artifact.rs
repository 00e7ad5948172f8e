// SPDX-License-Identifier: Apache-2.0

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One downloadable output file.
///
/// `path` is relative to the download root and always has the shape
/// `<directory>/<filename>`, which is also how the download route addresses
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactDescriptor {
    pub path: String,
    pub filename: String,
}

impl ArtifactDescriptor {
    pub fn new(directory: &str, filename: &str) -> Result<Self, ValidationError> {
        validate_segment("directory", directory)?;
        validate_segment("filename", filename)?;
        Ok(Self {
            path: format!("{directory}/{filename}"),
            filename: filename.to_string(),
        })
    }

    /// Directory component of [`Self::path`].
    #[must_use]
    pub fn directory(&self) -> &str {
        self.path
            .split_once('/')
            .map_or(self.path.as_str(), |(dir, _)| dir)
    }

    #[must_use]
    pub fn resolve(&self, download_root: &Path) -> PathBuf {
        download_root.join(self.directory()).join(&self.filename)
    }

    /// Checks a `(directory, filename)` pair taken from a download URL.
    pub fn check_download_segments(directory: &str, filename: &str) -> Result<(), ValidationError> {
        validate_segment("directory", directory)?;
        validate_segment("filename", filename)
    }

    /// URL path the download route serves this artifact on.
    #[must_use]
    pub fn download_href(&self) -> String {
        format!("/downloads/{}", self.path)
    }
}

/// A single path segment that cannot escape its parent directory.
fn validate_segment(what: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError(format!("{what} must not be empty")));
    }
    if value == "." || value == ".." {
        return Err(ValidationError(format!("{what} must not be a relative marker")));
    }
    if value.contains(['/', '\\', '\0']) {
        return Err(ValidationError(format!(
            "{what} must be a single path segment: {value}"
        )));
    }
    Ok(())
}
