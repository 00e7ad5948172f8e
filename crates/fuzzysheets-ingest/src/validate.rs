// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use fuzzysheets_model::{file_extension, InputSlot, OperationKind, ALLOWED_EXTENSIONS};

use crate::Rejection;

/// Outcome of running the validation chain over a submission's slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing was submitted: synthesize fresh output instead.
    Generate,
    /// Every slot is populated, distinct, and has an accepted extension.
    Accept,
    Reject(Rejection),
}

/// Applies the acceptance rules in order; the first failing rule decides.
///
/// Slots beyond `kind.required_slots()` are ignored and missing ones count as
/// absent.
#[must_use]
pub fn evaluate(kind: OperationKind, slots: &[InputSlot]) -> Verdict {
    let required = kind.required_slots();
    let names: Vec<&str> = slots
        .iter()
        .take(required)
        .filter_map(InputSlot::declared_name)
        .collect();

    if names.is_empty() {
        return Verdict::Generate;
    }
    if names.len() < required {
        return Verdict::Reject(Rejection::Incomplete(kind));
    }

    let distinct: HashSet<&str> = names.iter().copied().collect();
    if distinct.len() != names.len() {
        return Verdict::Reject(Rejection::DuplicateNames);
    }

    if names
        .iter()
        .any(|name| !ALLOWED_EXTENSIONS.contains(&file_extension(name)))
    {
        return Verdict::Reject(Rejection::BadExtension(kind));
    }

    Verdict::Accept
}
