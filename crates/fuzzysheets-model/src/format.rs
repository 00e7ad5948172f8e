// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Extensions accepted on submission, compared case-sensitively.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "xlsx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadsheetFormat {
    Csv,
    Xlsx,
}

impl SpreadsheetFormat {
    /// The format every input is normalized to before dispatch.
    pub const CANONICAL: Self = Self::Csv;

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Format of a file name, judged by its extension only.
    #[must_use]
    pub fn of_name(name: &str) -> Option<Self> {
        Self::from_extension(file_extension(name))
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    #[must_use]
    pub fn is_canonical(self) -> bool {
        self == Self::CANONICAL
    }
}

/// Extension of `name` without the dot, or `""` when there is none.
///
/// The extension is whatever follows the last `.` of the final path
/// component. Dots that only lead the component (`.csv`, `..csv`) do not
/// start an extension.
#[must_use]
pub fn file_extension(name: &str) -> &str {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    let base = &name[base_start..];
    let Some(dot) = base.rfind('.') else {
        return "";
    };
    if base[..dot].chars().all(|c| c == '.') {
        return "";
    }
    &base[dot + 1..]
}
