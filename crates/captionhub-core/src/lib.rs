//! Captionhub Core Library
//!
//! This crate provides the domain models, error types, configuration, file
//! validation and collaborator traits shared by every Captionhub component.

pub mod config;
pub mod error;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types
pub use config::{CaptionConfig, DamConfig, FileLimits, IngestConfig};
pub use error::{IngestError, IngestResult, LogLevel, UploadStep};
pub use models::{
    AssetId, AssetRecord, BatchReport, BatchStatus, Credential, PendingFile, PipelineOutcome,
    UploadSlot,
};
pub use traits::{
    AssetUploader, CaptionGenerator, MetadataWriter, TokenProvider, FALLBACK_CAPTION,
    MAX_CAPTION_CHARS,
};
pub use validation::{detect_content_type, FileValidator, ValidationError};
