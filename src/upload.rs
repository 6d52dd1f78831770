//! Reading multipart uploads into attachments.
//!
//! The form carries the JSON payload as a text part named `data` and zero or
//! more files named `attachments`. Files are read fully into memory, bounded
//! by [`UploadLimits`].

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::attachment::Attachment;
use crate::request::ValidationErrors;

/// Form part holding the JSON payload.
pub const DATA_FIELD: &str = "data";
/// Form part name for uploaded files.
pub const ATTACHMENTS_FIELD: &str = "attachments";

const FALLBACK_FILENAME: &str = "attachment";

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3",
];

/// Bounds on what a single request may upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_bytes: usize,
    pub max_total_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_bytes: 10 * 1024 * 1024,
            max_total_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload is over one of the configured limits.
    #[error("{0}")]
    Limit(String),

    /// The multipart stream could not be read.
    #[error("Failed to read multipart form: {0}")]
    Read(String),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::Limit(err.body_text())
        } else {
            Self::Read(err.body_text())
        }
    }
}

/// The parts of a multipart send request.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// Raw text of the `data` part, if sent.
    pub data: Option<String>,
    /// Uploaded files in request order.
    pub attachments: Vec<Attachment>,
}

impl UploadForm {
    /// Decode the `data` part as JSON.
    pub fn payload(&self) -> Result<Value, ValidationErrors> {
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| ValidationErrors::single(DATA_FIELD, "field required"))?;

        serde_json::from_str(data)
            .map_err(|e| ValidationErrors::single(DATA_FIELD, format!("invalid JSON: {}", e)))
    }
}

/// Read every part of the form.
///
/// Parts other than `data` and `attachments` are skipped.
pub async fn read_form(
    mut multipart: Multipart,
    limits: &UploadLimits,
) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();
    let mut total_bytes = 0;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(DATA_FIELD) => {
                form.data = Some(field.text().await?);
            }
            Some(ATTACHMENTS_FIELD) => {
                if form.attachments.len() >= limits.max_files {
                    return Err(UploadError::Limit(format!(
                        "Too many attachments: at most {} allowed",
                        limits.max_files
                    )));
                }
                let attachment = read_attachment(field, limits, total_bytes).await?;
                total_bytes += attachment.size();
                form.attachments.push(attachment);
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown form field");
            }
        }
    }

    Ok(form)
}

/// Stream one file part into memory.
///
/// The part is consumed by value and dropped on every return path.
async fn read_attachment(
    mut field: Field<'_>,
    limits: &UploadLimits,
    bytes_so_far: usize,
) -> Result<Attachment, UploadError> {
    let filename = sanitize_filename(field.file_name().unwrap_or_default());
    let content_type = field
        .content_type()
        .filter(|ct| !ct.is_empty())
        .map(str::to_owned);

    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        let size = data.len() + chunk.len();
        if size > limits.max_file_bytes {
            return Err(UploadError::Limit(format!(
                "Attachment '{}' exceeds {} bytes",
                filename, limits.max_file_bytes
            )));
        }
        if bytes_so_far + size > limits.max_total_bytes {
            return Err(UploadError::Limit(format!(
                "Attachments exceed {} bytes in total",
                limits.max_total_bytes
            )));
        }
        data.extend_from_slice(&chunk);
    }

    tracing::debug!(filename = %filename, size = data.len(), "Read attachment");

    let attachment = Attachment::from_bytes(filename, data);
    Ok(match content_type {
        Some(ct) => attachment.content_type(ct),
        None => attachment,
    })
}

/// Make a client-supplied filename safe to use downstream.
///
/// Decomposes accented letters to their ASCII base (NFKD), drops what is
/// still non-ASCII, turns path separators and whitespace into
/// underscores, keeps only `[A-Za-z0-9_.-]`, and trims leading/trailing dots
/// and underscores. Windows device names get a `_` prefix. Falls back to
/// `attachment` when nothing is left.
///
/// ```
/// use mailgate::upload::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(sanitize_filename("My cool movie.mov"), "My_cool_movie.mov");
/// assert_eq!(sanitize_filename("naïve résumé.pdf"), "naive_resume.pdf");
/// ```
pub fn sanitize_filename(filename: &str) -> String {
    let spaced: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
    {
        return format!("_{}", trimmed);
    }

    trimmed.to_string()
}
