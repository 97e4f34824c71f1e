use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;

use crate::validation::detect_content_type;

/// A user-supplied image waiting to be ingested.
///
/// Immutable once created. The payload is reference counted, so the upload and
/// caption steps of one pipeline share it without copying.
#[derive(Clone, Debug)]
pub struct PendingFile {
    file_name: String,
    content_type: String,
    data: Bytes,
}

impl PendingFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let data = data.into();
        let content_type = detect_content_type(&file_name, &data).to_string();

        Self {
            file_name,
            content_type,
            data,
        }
    }

    /// Read a file from disk. The file name is the last path component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?
            .to_string();

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(Self::new(file_name, data))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
