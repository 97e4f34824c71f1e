//! Batch orchestration
//!
//! [`IngestionOrchestrator`] owns the pending batch and its state machine:
//! `Idle -> Running -> Settled(report)`. A submit acquires one credential,
//! fans the batch out to per-file pipelines and settles once every upload
//! and caption has finished. Metadata writes keep running in the background
//! until [`IngestionOrchestrator::flush_enrichment`] is awaited.

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use captionhub_core::{
    BatchReport, BatchStatus, FileValidator, PendingFile, TokenProvider, ValidationError,
};

use crate::file_pipeline::{run_file_pipeline, FilePipelineResult, PipelineServices};

#[derive(Debug, Clone)]
pub enum BatchState {
    Idle,
    Running,
    Settled(BatchReport),
}

impl BatchState {
    pub fn is_idle(&self) -> bool {
        matches!(self, BatchState::Idle)
    }

    pub fn settled_status(&self) -> Option<BatchStatus> {
        match self {
            BatchState::Settled(report) => Some(report.status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorOptions {
    /// `None` runs every file of the batch at once
    pub max_concurrency: Option<usize>,
}

pub struct IngestionOrchestrator {
    token_provider: Arc<dyn TokenProvider>,
    services: PipelineServices,
    validator: FileValidator,
    options: OrchestratorOptions,
    files: Vec<PendingFile>,
    state: BatchState,
    enrichment: Vec<JoinHandle<()>>,
}

impl IngestionOrchestrator {
    pub fn new(
        token_provider: Arc<dyn TokenProvider>,
        services: PipelineServices,
        validator: FileValidator,
    ) -> Self {
        Self {
            token_provider,
            services,
            validator,
            options: OrchestratorOptions::default(),
            files: Vec::new(),
            state: BatchState::Idle,
            enrichment: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn validator(&self) -> &FileValidator {
        &self.validator
    }

    pub fn pending_files(&self) -> &[PendingFile] {
        &self.files
    }

    /// Report of the last settled batch
    pub fn report(&self) -> Option<&BatchReport> {
        match &self.state {
            BatchState::Settled(report) => Some(report),
            _ => None,
        }
    }

    /// Add a file to the batch after intake validation.
    ///
    /// Adding to a settled batch starts a new one: the state returns to
    /// `Idle` and earlier files stay pending.
    pub fn enqueue(&mut self, file: PendingFile) -> Result<(), ValidationError> {
        if let Err(e) = self.validator.validate(&file) {
            tracing::debug!(
                file_name = %file.file_name(),
                error = %e,
                "File rejected at intake"
            );
            return Err(e);
        }

        if matches!(self.state, BatchState::Settled(_)) {
            self.state = BatchState::Idle;
        }

        tracing::debug!(
            file_name = %file.file_name(),
            content_type = %file.content_type(),
            size = file.size(),
            "File added to batch"
        );
        self.files.push(file);
        Ok(())
    }

    /// Drop every pending file with this name. Returns how many were removed.
    pub fn remove(&mut self, file_name: &str) -> usize {
        let before = self.files.len();
        self.files.retain(|f| f.file_name() != file_name);
        let removed = before - self.files.len();

        if self.files.is_empty() {
            self.state = BatchState::Idle;
        }

        removed
    }

    pub fn reset(&mut self) {
        self.files.clear();
        self.state = BatchState::Idle;
        self.prune_enrichment();
    }

    // Finished writes have nothing left to report
    fn prune_enrichment(&mut self) {
        self.enrichment.retain(|h| !h.is_finished());
    }

    /// Run the pending batch to settlement.
    ///
    /// Returns `None` without touching the network when the batch is empty.
    /// A batch that already settled successfully is not uploaded again; a
    /// failed one is retried in full.
    pub async fn submit(&mut self) -> Option<&BatchReport> {
        if self.files.is_empty() {
            tracing::debug!("Submit with empty batch ignored");
            return None;
        }

        if self.state.settled_status() == Some(BatchStatus::Success) {
            tracing::debug!("Batch already uploaded, submit ignored");
            return self.report();
        }

        self.prune_enrichment();

        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "ingest_batch",
            batch_id = %batch_id,
            file_count = self.files.len()
        );

        self.state = BatchState::Running;
        let (report, enrichment) = self.run_batch(batch_id).instrument(span).await;

        self.enrichment.extend(enrichment);
        self.state = BatchState::Settled(report);
        self.report()
    }

    async fn run_batch(&self, batch_id: Uuid) -> (BatchReport, Vec<JoinHandle<()>>) {
        let started_at = Utc::now();

        let credential = match self.token_provider.acquire().await {
            Ok(credential) => credential,
            Err(e) => {
                e.log("Credential acquisition failed, no file was uploaded");
                return (BatchReport::batch_failed(batch_id, started_at, e), Vec::new());
            }
        };

        // Pipelines get their own handle on the bytes; the batch keeps its files
        let files = self.files.clone();
        let services = &self.services;

        let results: Vec<FilePipelineResult> = match self.options.max_concurrency {
            None => {
                join_all(
                    files
                        .into_iter()
                        .map(|file| run_file_pipeline(file, credential.clone(), services)),
                )
                .await
            }
            Some(limit) => {
                let mut indexed: Vec<(usize, FilePipelineResult)> =
                    stream::iter(files.into_iter().enumerate())
                        .map(|(index, file)| {
                            let credential = credential.clone();
                            async move { (index, run_file_pipeline(file, credential, services).await) }
                        })
                        .buffer_unordered(limit.max(1))
                        .collect()
                        .await;
                indexed.sort_by_key(|(index, _)| *index);
                indexed.into_iter().map(|(_, result)| result).collect()
            }
        };

        let mut outcomes = Vec::with_capacity(results.len());
        let mut enrichment = Vec::new();
        for result in results {
            outcomes.push(result.outcome);
            enrichment.extend(result.enrichment);
        }

        let report = BatchReport::from_outcomes(batch_id, started_at, outcomes);
        tracing::info!(
            status = ?report.status,
            uploaded = report.uploaded().count(),
            failed = report.failed_count(),
            "Batch settled"
        );

        (report, enrichment)
    }

    /// Number of metadata writes that have not completed yet
    pub fn pending_enrichment(&self) -> usize {
        self.enrichment.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every outstanding metadata write. Failures were already logged
    /// by the tasks themselves.
    pub async fn flush_enrichment(&mut self) -> usize {
        let handles = std::mem::take(&mut self.enrichment);
        let count = handles.len();

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Metadata write task did not complete");
            }
        }

        count
    }
}
