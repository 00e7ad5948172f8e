// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Shared vocabulary of the fuzzysheets pipeline.
//!
//! ```compile_fail
//! use fuzzysheets_model::OperationKind;
//!
//! fn exhaustive_match(k: OperationKind) -> &'static str {
//!     match k {
//!         OperationKind::Detect => "d",
//!     }
//! }
//! ```

mod artifact;
mod format;
mod operation;
mod slot;

use std::fmt::{Display, Formatter};

pub use artifact::ArtifactDescriptor;
pub use format::{file_extension, SpreadsheetFormat, ALLOWED_EXTENSIONS};
pub use operation::OperationKind;
pub use slot::{InputSlot, UploadedFile, ValidatedInput};

pub const CRATE_NAME: &str = "fuzzysheets-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
