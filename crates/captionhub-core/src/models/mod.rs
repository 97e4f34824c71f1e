//! Domain models for the ingestion pipeline.

pub mod asset;
pub mod credential;
pub mod file;
pub mod outcome;

pub use asset::{string_or_number, AssetId, AssetRecord, UploadSlot};
pub use credential::Credential;
pub use file::PendingFile;
pub use outcome::{BatchReport, BatchStatus, PipelineOutcome};
