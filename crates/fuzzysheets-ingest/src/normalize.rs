// SPDX-License-Identifier: Apache-2.0

use calamine::{open_workbook, Data, Reader, Xlsx};
use fuzzysheets_model::SpreadsheetFormat;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError(pub String);

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConversionError {}

/// Returns a path to `path`'s content in the canonical format.
///
/// Canonical files are returned untouched. Other recognized formats are
/// converted next to the original, which is removed once the converted file
/// is complete.
pub fn normalize_to_canonical(path: &Path) -> Result<PathBuf, ConversionError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match SpreadsheetFormat::from_extension(ext) {
        Some(format) if format.is_canonical() => Ok(path.to_path_buf()),
        Some(SpreadsheetFormat::Xlsx) => {
            let converted = xlsx_to_csv(path)?;
            fs::remove_file(path)
                .map_err(|e| ConversionError(format!("remove {}: {e}", path.display())))?;
            info!(
                source = %path.display(),
                target = %converted.display(),
                "converted workbook to csv"
            );
            Ok(converted)
        }
        _ => Err(ConversionError(format!(
            "unsupported spreadsheet format: {}",
            path.display()
        ))),
    }
}

fn xlsx_to_csv(path: &Path) -> Result<PathBuf, ConversionError> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| ConversionError(e.to_string()))?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ConversionError("workbook has no worksheets".to_string()))?
        .map_err(|e| ConversionError(e.to_string()))?;

    // The range starts at the first used cell; leading empty columns are
    // restored so positions match the sheet.
    let pad = sheet.start().map_or(0, |(_, col)| col as usize);
    let target = path.with_extension(SpreadsheetFormat::CANONICAL.extension());
    write_or_discard(&target, |writer| {
        for (index, row) in sheet.rows().enumerate() {
            let cells = std::iter::repeat(String::new())
                .take(pad)
                .chain(row.iter().map(cell_text));
            let record: Vec<String> = if index == 0 {
                cells.enumerate().map(|(i, c)| header_text(i, c)).collect()
            } else {
                cells.collect()
            };
            writer
                .write_record(&record)
                .map_err(|e| ConversionError(e.to_string()))?;
        }
        Ok(())
    })?;
    Ok(target)
}

/// Writes `target` through `fill`; on any failure the partial file is removed.
fn write_or_discard(
    target: &Path,
    fill: impl FnOnce(&mut csv::Writer<fs::File>) -> Result<(), ConversionError>,
) -> Result<(), ConversionError> {
    let mut writer = csv::Writer::from_path(target).map_err(|e| ConversionError(e.to_string()))?;
    let written = fill(&mut writer).and_then(|()| {
        writer
            .flush()
            .map_err(|e| ConversionError(e.to_string()))
    });
    if written.is_err() {
        drop(writer);
        if let Err(e) = fs::remove_file(target) {
            warn!(target = %target.display(), error = %e, "failed to remove partial csv");
        }
    }
    written
}

// Empty header cells get pandas-style placeholder names.
fn header_text(index: usize, cell: String) -> String {
    if cell.is_empty() {
        format!("Unnamed: {index}")
    } else {
        cell
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        Data::DateTime(dt) => dt.as_datetime().map_or_else(
            || float_text(dt.as_f64()),
            |d| d.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        other => other.to_string(),
    }
}

// Spreadsheet numbers are all floats; whole values are written as integers.
fn float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
