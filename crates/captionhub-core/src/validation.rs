//! Intake validation for files entering a batch.

use std::path::Path;

use crate::config::FileLimits;
use crate::models::PendingFile;

/// Reasons a file is refused before it joins a batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Detect the content type of an image, trusting magic bytes over the file name.
pub fn detect_content_type(file_name: &str, data: &[u8]) -> &'static str {
    if data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return "image/jpeg";
    }

    if data.len() >= 4 && data[..4] == [0x89, 0x50, 0x4E, 0x47] {
        return "image/png";
    }

    if data.len() >= 3 && &data[..3] == b"GIF" {
        return "image/gif";
    }

    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    match extension_of(file_name).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Checks files against the configured size, extension and content-type limits.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl FileValidator {
    pub fn new(
        max_file_size: u64,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn from_limits(limits: &FileLimits) -> Self {
        Self::new(
            limits.max_file_size_bytes,
            limits.allowed_extensions.clone(),
            limits.allowed_content_types.clone(),
        )
    }

    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn validate_extension(&self, file_name: &str) -> Result<(), ValidationError> {
        let extension = extension_of(file_name)
            .ok_or_else(|| ValidationError::InvalidFilename(file_name.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    pub fn validate(&self, file: &PendingFile) -> Result<(), ValidationError> {
        if file.file_name().trim().is_empty() {
            return Err(ValidationError::InvalidFilename(file.file_name().to_string()));
        }
        self.validate_file_size(file.size())?;
        self.validate_extension(file.file_name())?;
        self.validate_content_type(file.content_type())?;
        Ok(())
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::from_limits(&FileLimits::default())
    }
}
