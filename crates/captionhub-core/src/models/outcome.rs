//! Per-file and per-batch results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::asset::AssetRecord;
use crate::error::IngestError;

/// Result of one file's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Upload finalized; the asset exists in the DAM
    Uploaded(AssetRecord),
    /// One of the upload steps failed; no asset was created
    Failed {
        file_name: String,
        error: IngestError,
    },
}

impl PipelineOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            PipelineOutcome::Uploaded(record) => &record.file_name,
            PipelineOutcome::Failed { file_name, .. } => file_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Uploaded(_))
    }

    pub fn asset(&self) -> Option<&AssetRecord> {
        match self {
            PipelineOutcome::Uploaded(record) => Some(record),
            PipelineOutcome::Failed { .. } => None,
        }
    }
}

/// Aggregate status of a settled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    Failed,
}

/// Everything a settled batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    /// Batch-level failure (credential acquisition); per-file failures live in `outcomes`
    pub error: Option<IngestError>,
    pub outcomes: Vec<PipelineOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// Reduce per-file outcomes: the batch fails if any upload failed.
    /// Caption and metadata problems never reach this point.
    pub fn from_outcomes(
        batch_id: Uuid,
        started_at: DateTime<Utc>,
        outcomes: Vec<PipelineOutcome>,
    ) -> Self {
        let status = if outcomes.iter().all(PipelineOutcome::is_success) {
            BatchStatus::Success
        } else {
            BatchStatus::Failed
        };

        Self {
            batch_id,
            status,
            error: None,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// A batch that never started any file because it had no credential.
    pub fn batch_failed(batch_id: Uuid, started_at: DateTime<Utc>, error: IngestError) -> Self {
        Self {
            batch_id,
            status: BatchStatus::Failed,
            error: Some(error),
            outcomes: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn uploaded(&self) -> impl Iterator<Item = &AssetRecord> {
        self.outcomes.iter().filter_map(PipelineOutcome::asset)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// Outcome for a given file name, if that file was part of the batch.
    pub fn outcome_for(&self, file_name: &str) -> Option<&PipelineOutcome> {
        self.outcomes.iter().find(|o| o.file_name() == file_name)
    }
}
