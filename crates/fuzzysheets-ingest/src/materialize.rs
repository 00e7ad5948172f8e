// SPDX-License-Identifier: Apache-2.0

use fuzzysheets_model::{file_extension, InputSlot, ValidatedInput};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{
    normalize_to_canonical, secure_filename, IngestError, Rejection, RequestPrefix, StorageLayout,
};

enum Source<'a> {
    Bytes(&'a [u8]),
    File(PathBuf),
}

/// Writes every accepted slot to the upload area and normalizes it.
///
/// Must only be called after the validation chain accepted `slots`. Server
/// references are resolved up front so a bad reference is rejected before
/// anything is written. Originals behind server references are copied, never
/// moved or modified.
pub fn materialize(
    slots: &[InputSlot],
    layout: &StorageLayout,
    prefix: &RequestPrefix,
) -> Result<Vec<ValidatedInput>, IngestError> {
    let mut sources = Vec::with_capacity(slots.len());
    for (index, slot) in slots.iter().enumerate() {
        let source = match slot {
            InputSlot::Absent => {
                return Err(IngestError::Storage(format!(
                    "slot {} reached materialization without input",
                    index + 1
                )))
            }
            InputSlot::Upload(file) => (file.declared_name.as_str(), Source::Bytes(&file.data)),
            InputSlot::ServerRef(reference) => (
                reference.as_str(),
                Source::File(layout.resolve_server_file(reference)?),
            ),
        };
        sources.push(source);
    }

    fs::create_dir_all(&layout.upload_dir)
        .map_err(|e| IngestError::Storage(format!("create upload dir: {e}")))?;

    let mut inputs = Vec::with_capacity(sources.len());
    for (index, (declared, source)) in sources.into_iter().enumerate() {
        let stored = layout
            .upload_dir
            .join(prefix.stored_name(index, &storage_file_name(declared)));
        match &source {
            Source::Bytes(data) => write_new(&stored, data),
            Source::File(original) => copy_new(original, &stored),
        }
        .map_err(|e| IngestError::Storage(format!("store {}: {e}", stored.display())))?;

        let path = normalize_to_canonical(&stored)
            .map_err(|e| IngestError::Rejected(Rejection::Conversion(e.0)))?;
        info!(
            slot = index + 1,
            source = slots[index].source_tag(),
            declared = %declared,
            path = %path.display(),
            "input materialized"
        );
        inputs.push(ValidatedInput {
            path,
            original_name: declared.to_string(),
        });
    }
    Ok(inputs)
}

/// File name an input is stored under, before the request prefix is added.
///
/// Falls back to `upload.<ext>` when sanitizing loses the extension the name
/// was validated with.
#[must_use]
pub fn storage_file_name(declared: &str) -> String {
    let ext = file_extension(declared);
    let sanitized = secure_filename(declared);
    if !sanitized.is_empty() && file_extension(&sanitized) == ext {
        sanitized
    } else {
        format!("upload.{ext}")
    }
}

fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn write_new(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = create_new(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn copy_new(source: &Path, target: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = create_new(target)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()
}
