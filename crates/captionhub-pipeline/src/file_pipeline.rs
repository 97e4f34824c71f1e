//! One file's journey: upload, caption, then detached metadata write-back.

use captionhub_core::{
    AssetRecord, AssetUploader, CaptionGenerator, Credential, MetadataWriter, PendingFile,
    PipelineOutcome,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Collaborators a file pipeline talks to, shared by every file in a batch.
#[derive(Clone)]
pub struct PipelineServices {
    pub uploader: Arc<dyn AssetUploader>,
    pub captioner: Arc<dyn CaptionGenerator>,
    pub metadata_writer: Arc<dyn MetadataWriter>,
}

impl PipelineServices {
    pub fn new(
        uploader: Arc<dyn AssetUploader>,
        captioner: Arc<dyn CaptionGenerator>,
        metadata_writer: Arc<dyn MetadataWriter>,
    ) -> Self {
        Self {
            uploader,
            captioner,
            metadata_writer,
        }
    }
}

pub struct FilePipelineResult {
    pub outcome: PipelineOutcome,
    /// Metadata write still in flight. `None` when the upload failed.
    pub enrichment: Option<JoinHandle<()>>,
}

/// Run the pipeline for a single file.
///
/// Upload failures end the pipeline and are reported in the outcome. Caption
/// failures are absorbed by [`CaptionGenerator::describe`]. The metadata write
/// is spawned and never awaited here, so the outcome is available as soon as
/// the caption is.
pub async fn run_file_pipeline(
    file: PendingFile,
    credential: Credential,
    services: &PipelineServices,
) -> FilePipelineResult {
    let asset_id = match services.uploader.upload(&file, &credential).await {
        Ok(id) => id,
        Err(e) => {
            e.log("File upload failed");
            return FilePipelineResult {
                outcome: PipelineOutcome::Failed {
                    file_name: file.file_name().to_string(),
                    error: e,
                },
                enrichment: None,
            };
        }
    };

    let caption = services.captioner.describe(&file).await;

    let writer = services.metadata_writer.clone();
    let write_asset_id = asset_id.clone();
    let write_caption = caption.clone();
    let enrichment = tokio::spawn(async move {
        if let Err(e) = writer
            .attach_caption(&write_asset_id, &write_caption, &credential)
            .await
        {
            e.log("Failed to attach caption to asset");
        }
    });

    FilePipelineResult {
        outcome: PipelineOutcome::Uploaded(AssetRecord {
            asset_id,
            file_name: file.file_name().to_string(),
            caption,
        }),
        enrichment: Some(enrichment),
    }
}
