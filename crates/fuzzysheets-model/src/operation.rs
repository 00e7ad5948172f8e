// SPDX-License-Identifier: Apache-2.0

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The two operations a submission can be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// One input file; duplicates are inferred within it.
    Detect,
    /// Two input files; they are combined into one.
    Merge,
}

impl OperationKind {
    pub const ALL: [Self; 2] = [Self::Detect, Self::Merge];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "detect" => Ok(Self::Detect),
            "merge" => Ok(Self::Merge),
            other => Err(ValidationError(format!(
                "operation must be 'detect' or 'merge', got '{other}'"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Merge => "merge",
        }
    }

    /// Number of input slots a submission of this kind carries.
    #[must_use]
    pub const fn required_slots(self) -> usize {
        match self {
            Self::Detect => 1,
            Self::Merge => 2,
        }
    }

    #[must_use]
    pub const fn is_paired(self) -> bool {
        self.required_slots() > 1
    }

    /// Route the results view for this kind lives on.
    #[must_use]
    pub const fn results_path(self) -> &'static str {
        match self {
            Self::Detect => "/detect",
            Self::Merge => "/merge",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
