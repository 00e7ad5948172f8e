// SPDX-License-Identifier: Apache-2.0

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use fuzzysheets_model::{InputSlot, OperationKind, UploadedFile};
use std::collections::HashMap;

use super::errors::AppError;

/// The parts of one multipart submission, keyed by field name. A repeated
/// field keeps its first value.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl SubmissionForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await.map_err(multipart_error)?;
                    form.files
                        .entry(name)
                        .or_insert_with(|| UploadedFile::new(file_name, data));
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.entry(name).or_insert(value);
                }
            }
        }
        Ok(form)
    }

    #[must_use]
    pub fn with_file(mut self, field: &str, file: UploadedFile) -> Self {
        self.files.entry(field.to_string()).or_insert(file);
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: &str, value: &str) -> Self {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| value.to_string());
        self
    }

    #[must_use]
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.get(field)
    }

    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::new(e.status(), e.body_text())
}

/// One slot per required input: `file<N>` wins over `server_file<N>` when
/// its declared name is non-empty; otherwise the slot is absent.
#[must_use]
pub fn resolve_slots(kind: OperationKind, form: &SubmissionForm) -> Vec<InputSlot> {
    (1..=kind.required_slots())
        .map(|n| {
            if let Some(upload) = form
                .file(&format!("file{n}"))
                .filter(|f| !f.declared_name.is_empty())
            {
                InputSlot::Upload(upload.clone())
            } else if let Some(reference) = form
                .field(&format!("server_file{n}"))
                .filter(|r| !r.is_empty())
            {
                InputSlot::ServerRef(reference.to_string())
            } else {
                InputSlot::Absent
            }
        })
        .collect()
}
