//! Collaborator traits for the ingestion pipeline.
//!
//! The orchestrator only talks to these traits, so it can run against the
//! real HTTP clients or against in-memory doubles in tests.

use async_trait::async_trait;

use crate::error::IngestResult;
use crate::models::{AssetId, Credential, PendingFile};

/// Caption attached when generation fails for any reason.
pub const FALLBACK_CAPTION: &str = "Default alt text";

/// Longest caption that is written back to the DAM, in characters.
pub const MAX_CAPTION_CHARS: usize = 150;

/// Obtains a bearer credential for the DAM.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a fresh credential. No caching; every call hits the token endpoint.
    async fn acquire(&self) -> IngestResult<Credential>;
}

/// Drives the request-slot, transfer and finalize protocol for one file.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload one file and return the identifier of the finalized asset.
    ///
    /// Failures are `IngestError::Upload` tagged with the failing step.
    async fn upload(&self, file: &PendingFile, credential: &Credential) -> IngestResult<AssetId>;
}

/// Produces a short accessibility caption for an image.
#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    /// Ask the model for a caption. Implementations report every problem here.
    async fn generate(&self, file: &PendingFile) -> IngestResult<String>;

    /// Caption that is safe to attach: never fails, falls back to
    /// [`FALLBACK_CAPTION`] and is capped at [`MAX_CAPTION_CHARS`].
    async fn describe(&self, file: &PendingFile) -> String {
        match self.generate(file).await {
            Ok(caption) => {
                let caption = caption.trim();
                if caption.is_empty() {
                    tracing::warn!(
                        file_name = %file.file_name(),
                        "Caption service returned empty text, using fallback caption"
                    );
                    FALLBACK_CAPTION.to_string()
                } else {
                    truncate_chars(caption, MAX_CAPTION_CHARS)
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    file_name = %file.file_name(),
                    "Caption generation failed, using fallback caption"
                );
                FALLBACK_CAPTION.to_string()
            }
        }
    }
}

/// Writes the caption onto an existing asset.
#[async_trait]
pub trait MetadataWriter: Send + Sync {
    async fn attach_caption(
        &self,
        asset_id: &AssetId,
        caption: &str,
        credential: &Credential,
    ) -> IngestResult<()>;
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}
