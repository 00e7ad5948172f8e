// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use fuzzysheets_ingest::secure_filename;
use fuzzysheets_model::{ArtifactDescriptor, OperationKind, ValidatedInput};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::{BackendError, OperationBackend, RunContext};

const GROUP_COLUMN: &str = "duplicate_group";
const SOURCE_COLUMN: &str = "source";
const MERGED_FILE: &str = "merged.csv";

/// Reference backend matching rows on normalized field values.
///
/// Fields are compared trimmed, lower-cased and with inner whitespace runs
/// collapsed, so only case and spacing differences are forgiven.
#[derive(Debug, Clone, Default)]
pub struct ExactMatchBackend;

#[async_trait]
impl OperationBackend for ExactMatchBackend {
    fn backend_tag(&self) -> &'static str {
        "exact"
    }

    async fn run(
        &self,
        kind: OperationKind,
        inputs: &[ValidatedInput],
        ctx: &RunContext,
    ) -> Result<Vec<ArtifactDescriptor>, BackendError> {
        if inputs.len() != kind.required_slots() {
            return Err(BackendError(format!(
                "{kind} needs {} input(s), got {}",
                kind.required_slots(),
                inputs.len()
            )));
        }
        let inputs = inputs.to_vec();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || match kind {
            OperationKind::Detect => detect(&inputs[0], &ctx),
            OperationKind::Merge => merge(&inputs, &ctx),
        })
        .await
        .map_err(|e| BackendError(format!("backend task failed: {e}")))?
    }
}

fn normalize_field(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn row_key<'a>(fields: impl Iterator<Item = &'a str>) -> Vec<String> {
    fields.map(normalize_field).collect()
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn read_table(path: &Path) -> Result<Table, BackendError> {
    let err = |e: csv::Error| BackendError(format!("read {}: {e}", path.display()));
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(err)?;
    let headers = reader
        .headers()
        .map_err(err)?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(err)?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len().max(row.len()), String::new());
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

fn write_table<'a>(
    path: &Path,
    headers: &[String],
    rows: impl Iterator<Item = &'a [String]>,
) -> Result<(), BackendError> {
    let err = |e: csv::Error| BackendError(format!("write {}: {e}", path.display()));
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(err)?;
    writer.write_record(headers).map_err(err)?;
    for row in rows {
        writer.write_record(row).map_err(err)?;
    }
    writer
        .flush()
        .map_err(|e| BackendError(format!("flush {}: {e}", path.display())))
}

fn output_stem(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(secure_filename)
        .unwrap_or_default();
    if stem.is_empty() {
        "input".to_string()
    } else {
        stem
    }
}

fn detect(input: &ValidatedInput, ctx: &RunContext) -> Result<Vec<ArtifactDescriptor>, BackendError> {
    let table = read_table(&input.path)?;
    let keys: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row_key(row.iter().map(String::as_str)))
        .collect();
    let mut counts: HashMap<&[String], usize> = HashMap::new();
    for key in &keys {
        *counts.entry(key.as_slice()).or_insert(0) += 1;
    }

    // Groups are numbered in order of first appearance.
    let mut groups: HashMap<&[String], usize> = HashMap::new();
    let mut annotated = Vec::with_capacity(table.rows.len());
    for (row, key) in table.rows.iter().zip(&keys) {
        let group = if counts.get(key.as_slice()).copied().unwrap_or(0) > 1 {
            let next = groups.len() + 1;
            groups.entry(key.as_slice()).or_insert(next).to_string()
        } else {
            String::new()
        };
        let mut out = row.clone();
        out.push(group);
        annotated.push(out);
    }

    let mut headers = table.headers;
    headers.push(GROUP_COLUMN.to_string());
    let filename = format!("{}_duplicates.csv", output_stem(&input.original_name));
    write_table(
        &ctx.output_dir.join(&filename),
        &headers,
        annotated.iter().map(Vec::as_slice),
    )?;
    Ok(vec![ctx.artifact(&filename)?])
}

fn merge(inputs: &[ValidatedInput], ctx: &RunContext) -> Result<Vec<ArtifactDescriptor>, BackendError> {
    let tables = inputs
        .iter()
        .map(|input| read_table(&input.path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut headers: Vec<String> = Vec::new();
    for table in &tables {
        for header in &table.headers {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
    }

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut merged: Vec<Vec<String>> = Vec::new();
    for (input, table) in inputs.iter().zip(&tables) {
        let positions: Vec<Option<usize>> = headers
            .iter()
            .map(|h| table.headers.iter().position(|t| t == h))
            .collect();
        for row in &table.rows {
            let aligned: Vec<String> = positions
                .iter()
                .map(|p| p.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                .collect();
            if seen.insert(row_key(aligned.iter().map(String::as_str))) {
                let mut out = aligned;
                out.push(input.original_name.clone());
                merged.push(out);
            }
        }
    }

    let mut out_headers = headers;
    out_headers.push(SOURCE_COLUMN.to_string());
    write_table(
        &ctx.output_dir.join(MERGED_FILE),
        &out_headers,
        merged.iter().map(Vec::as_slice),
    )?;
    Ok(vec![ctx.artifact(MERGED_FILE)?])
}
