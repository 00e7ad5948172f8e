// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod layout;
mod materialize;
mod normalize;
mod sanitize;
mod validate;

use fuzzysheets_model::OperationKind;
use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "fuzzysheets-ingest";

pub use layout::{output_directory_name, random_token, RequestPrefix, StorageLayout, TOKEN_LEN};
pub use materialize::{materialize, storage_file_name};
pub use normalize::{normalize_to_canonical, ConversionError};
pub use sanitize::secure_filename;
pub use validate::{evaluate, Verdict};

/// A submission the user can fix and resubmit.
///
/// The `Display` text is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Incomplete(OperationKind),
    DuplicateNames,
    BadExtension(OperationKind),
    ServerFileUnavailable(String),
    Conversion(String),
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incomplete(OperationKind::Detect) => {
                f.write_str("You must select a csv/xlsx file or Generate a spreadsheet")
            }
            Self::Incomplete(OperationKind::Merge) => {
                f.write_str("You must select two csv/xlsx files or Generate spreadsheets")
            }
            Self::DuplicateNames => f.write_str("You must provide two different files"),
            Self::BadExtension(OperationKind::Detect) => {
                f.write_str("The input file must have a csv or xlsx extension.")
            }
            Self::BadExtension(OperationKind::Merge) => {
                f.write_str("Both input files must have a csv or xlsx extension.")
            }
            Self::ServerFileUnavailable(name) => {
                write!(f, "Server file '{name}' is not available")
            }
            Self::Conversion(reason) => write!(f, "Error converting Excel file: {reason}"),
        }
    }
}

impl Rejection {
    /// Short machine label used in logs.
    #[must_use]
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Incomplete(_) => "completeness",
            Self::DuplicateNames => "distinctness",
            Self::BadExtension(_) => "extension",
            Self::ServerFileUnavailable(_) => "server_file",
            Self::Conversion(_) => "conversion",
        }
    }
}

#[derive(Debug)]
pub enum IngestError {
    /// The input is unusable as submitted.
    Rejected(Rejection),
    /// Local storage failed underneath a valid submission.
    Storage(String),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(rejection) => write!(f, "{rejection}"),
            Self::Storage(message) => write!(f, "storage failure: {message}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<Rejection> for IngestError {
    fn from(value: Rejection) -> Self {
        Self::Rejected(value)
    }
}
