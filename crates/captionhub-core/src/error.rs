//! Error types module
//!
//! All pipeline failures are unified under [`IngestError`]. Each variant knows
//! how far it propagates: an `Auth` failure ends the whole batch, an `Upload`
//! failure ends one file's pipeline, and `Caption`/`Metadata` failures are
//! best-effort and only ever logged.

use serde::Serialize;
use std::fmt;

use crate::models::AssetId;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Warning level - for degraded but recoverable behavior
    Warn,
    /// Error level - for failures that cost the user an asset
    Error,
}

/// The three ordered sub-steps of a DAM upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    /// Ask the DAM for an upload slot and transfer URL
    RequestSlot,
    /// Send the file bytes to the transfer URL
    Transfer,
    /// Convert the completed transfer into an asset
    Finalize,
}

impl UploadStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStep::RequestSlot => "request_slot",
            UploadStep::Transfer => "transfer",
            UploadStep::Finalize => "finalize",
        }
    }
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Upload failed at {step} for {file_name}: {message}")]
    Upload {
        step: UploadStep,
        file_name: String,
        message: String,
    },

    #[error("Caption generation failed: {message}")]
    Caption { message: String },

    #[error("Metadata update failed for asset {asset_id}: {message}")]
    Metadata { asset_id: String, message: String },
}

pub type IngestResult<T> = Result<T, IngestError>;

impl IngestError {
    // The alternate formatter keeps the whole anyhow context chain on one line.

    pub fn auth(err: anyhow::Error) -> Self {
        IngestError::Auth {
            message: format!("{:#}", err),
        }
    }

    pub fn upload(step: UploadStep, file_name: &str, err: anyhow::Error) -> Self {
        IngestError::Upload {
            step,
            file_name: file_name.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn caption(err: anyhow::Error) -> Self {
        IngestError::Caption {
            message: format!("{:#}", err),
        }
    }

    pub fn metadata(asset_id: &AssetId, err: anyhow::Error) -> Self {
        IngestError::Metadata {
            asset_id: asset_id.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Machine-readable error code (e.g., "UPLOAD_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            IngestError::Auth { .. } => "AUTH_ERROR",
            IngestError::Upload { .. } => "UPLOAD_ERROR",
            IngestError::Caption { .. } => "CAPTION_ERROR",
            IngestError::Metadata { .. } => "METADATA_ERROR",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            IngestError::Auth { .. } | IngestError::Upload { .. } => LogLevel::Error,
            IngestError::Caption { .. } | IngestError::Metadata { .. } => LogLevel::Warn,
        }
    }

    /// The upload step that failed, if this is an upload error.
    pub fn upload_step(&self) -> Option<UploadStep> {
        match self {
            IngestError::Upload { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Emit this error through `tracing` at its own log level.
    pub fn log(&self, context: &str) {
        match self.log_level() {
            LogLevel::Warn => {
                tracing::warn!(error = %self, error_code = self.error_code(), "{}", context)
            }
            LogLevel::Error => {
                tracing::error!(error = %self, error_code = self.error_code(), "{}", context)
            }
        }
    }
}
