// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use std::path::PathBuf;

/// A file received inline with the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub declared_name: String,
    pub data: Bytes,
}

impl UploadedFile {
    #[must_use]
    pub fn new(declared_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            declared_name: declared_name.into(),
            data: data.into(),
        }
    }
}

/// Where one logical input of a submission comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSlot {
    Absent,
    Upload(UploadedFile),
    ServerRef(String),
}

impl InputSlot {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The name the client gave this input: the upload's declared file name
    /// or the reference string as submitted.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Upload(file) => Some(file.declared_name.as_str()),
            Self::ServerRef(reference) => Some(reference.as_str()),
        }
    }

    #[must_use]
    pub fn source_tag(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Upload(_) => "upload",
            Self::ServerRef(_) => "server",
        }
    }
}

/// An input that passed validation and now lives on local storage in the
/// canonical format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub original_name: String,
}
