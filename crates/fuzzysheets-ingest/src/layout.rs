// SPDX-License-Identifier: Apache-2.0

use chrono::{Local, NaiveDate, NaiveDateTime};
use fuzzysheets_model::OperationKind;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Rejection;

/// Length of the random lowercase disambiguator in generated names.
pub const TOKEN_LEN: usize = 5;

#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Where submitted inputs are materialized.
    pub upload_dir: PathBuf,
    /// Server references must resolve inside this directory.
    pub server_files_root: PathBuf,
}

impl StorageLayout {
    #[must_use]
    pub fn new(upload_dir: impl Into<PathBuf>, server_files_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            server_files_root: server_files_root.into(),
        }
    }

    /// Resolves a server reference to a regular file inside the server-files
    /// root. Relative references are taken relative to that root.
    pub fn resolve_server_file(&self, reference: &str) -> Result<PathBuf, Rejection> {
        let unavailable = || Rejection::ServerFileUnavailable(reference.to_string());
        let root = self
            .server_files_root
            .canonicalize()
            .map_err(|_| unavailable())?;
        let requested = Path::new(reference);
        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            root.join(requested)
        };
        let canonical = candidate.canonicalize().map_err(|_| unavailable())?;
        if !canonical.starts_with(&root) {
            return Err(unavailable());
        }
        let meta = fs::metadata(&canonical).map_err(|_| unavailable())?;
        if !meta.is_file() {
            return Err(unavailable());
        }
        Ok(canonical)
    }
}

/// Per-request prefix for materialized inputs:
/// `<kind>_<YYYY_MM_DD>_<token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPrefix {
    kind: OperationKind,
    prefix: String,
}

impl RequestPrefix {
    #[must_use]
    pub fn new(kind: OperationKind, date: NaiveDate, token: &str) -> Self {
        Self {
            kind,
            prefix: format!("{}_{}_{token}", kind.as_str(), date.format("%Y_%m_%d")),
        }
    }

    #[must_use]
    pub fn generate(kind: OperationKind) -> Self {
        Self::new(kind, Local::now().date_naive(), &random_token())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Stored file name for the input in `slot_index` (0-based). Paired
    /// operations carry a 1-based slot number so the two inputs sort next to
    /// each other and stay distinguishable.
    #[must_use]
    pub fn stored_name(&self, slot_index: usize, file_name: &str) -> String {
        if self.kind.is_paired() {
            format!("{}_{}_{file_name}", self.prefix, slot_index + 1)
        } else {
            format!("{}_{file_name}", self.prefix)
        }
    }
}

#[must_use]
pub fn random_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
        .collect()
}

/// Name of a fresh output directory: `<label>_<YYYY_MM_DD_HH_MM_SS>_<token>`.
#[must_use]
pub fn output_directory_name(label: &str, at: NaiveDateTime, token: &str) -> String {
    format!("{label}_{}_{token}", at.format("%Y_%m_%d_%H_%M_%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).expect("date")
    }

    #[test]
    fn prefix_embeds_kind_date_and_token() {
        let p = RequestPrefix::new(OperationKind::Detect, date(), "abcde");
        assert_eq!(p.as_str(), "detect_2024_03_09_abcde");
        assert_eq!(p.stored_name(0, "a.csv"), "detect_2024_03_09_abcde_a.csv");
    }

    #[test]
    fn paired_prefix_numbers_slots_from_one() {
        let p = RequestPrefix::new(OperationKind::Merge, date(), "zzzzz");
        assert_eq!(p.stored_name(0, "a.csv"), "merge_2024_03_09_zzzzz_1_a.csv");
        assert_eq!(p.stored_name(1, "b.csv"), "merge_2024_03_09_zzzzz_2_b.csv");
    }

    #[test]
    fn random_token_is_lowercase_ascii() {
        let t = random_token();
        assert_eq!(t.len(), TOKEN_LEN);
        assert!(t.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn output_directory_name_has_second_resolution() {
        let at = date().and_hms_opt(14, 5, 6).expect("time");
        assert_eq!(
            output_directory_name("generate", at, "qwert"),
            "generate_2024_03_09_14_05_06_qwert"
        );
    }

    #[test]
    fn server_reference_must_stay_inside_root() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path().join("shared");
        fs::create_dir_all(root.join("nested")).expect("mkdir");
        fs::write(root.join("nested/in.csv"), b"a\n1\n").expect("write");
        fs::write(tmp.path().join("outside.csv"), b"a\n1\n").expect("write");
        let layout = StorageLayout::new(tmp.path().join("uploads"), &root);

        let ok = layout.resolve_server_file("nested/in.csv").expect("inside root");
        assert!(ok.ends_with("nested/in.csv"));

        let abs = root.join("nested/in.csv");
        assert!(layout
            .resolve_server_file(abs.to_str().expect("utf8 path"))
            .is_ok());

        assert_eq!(
            layout.resolve_server_file("../outside.csv"),
            Err(Rejection::ServerFileUnavailable("../outside.csv".to_string()))
        );
        assert!(layout.resolve_server_file("nested").is_err());
        assert!(layout.resolve_server_file("missing.csv").is_err());
    }
}
