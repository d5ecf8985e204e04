//! File selection for a matching run: one job description and up to three
//! resumes, validated before anything touches the network.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use thiserror::Error;

pub mod validator;

pub use validator::{PendingUpload, Submission};

/// Per-file size ceiling (5 MiB).
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
pub const MAX_RESUMES: usize = 3;

pub const MEDIA_TYPE_PDF: &str = "application/pdf";
pub const MEDIA_TYPE_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MEDIA_TYPE_DOC: &str = "application/msword";

const ACCEPTED_MEDIA_TYPES: &[&str] = &[MEDIA_TYPE_PDF, MEDIA_TYPE_DOCX, MEDIA_TYPE_DOC];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("File size too large: {}. Maximum 5MB per file.", .files.join(", "))]
    FileTooLarge { files: Vec<String> },

    #[error("Invalid file types: {}. Only PDF and DOCX files allowed.", .files.join(", "))]
    UnsupportedType { files: Vec<String> },

    #[error("Maximum {max} resumes allowed")]
    TooManyFiles { max: usize },

    #[error("No new files to add. Files may already be uploaded or invalid.")]
    NoNewFiles,

    #[error("Please upload both job description and at least one resume")]
    IncompleteSelection,
}

/// A file picked by the user, with the media type the picker declared.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub contents: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        let contents = contents.into();
        Self {
            name: name.into(),
            size: contents.len() as u64,
            media_type: media_type.into(),
            contents,
        }
    }

    /// Reads a file from disk, declaring its media type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");

        Ok(Self::new(name, media_type, contents))
    }

    pub fn is_too_large(&self) -> bool {
        self.size > MAX_FILE_SIZE
    }

    pub fn is_supported_type(&self) -> bool {
        ACCEPTED_MEDIA_TYPES.contains(&self.media_type.as_str())
    }

    /// Two selections are the same file when name and size match.
    pub fn same_file_as(&self, other: &SelectedFile) -> bool {
        self.name == other.name && self.size == other.size
    }
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["Bytes", "KB", "MB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
