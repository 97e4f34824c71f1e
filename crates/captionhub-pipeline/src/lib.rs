//! Ingestion pipeline
//!
//! Per-file pipeline (upload, caption, metadata write-back) and the batch
//! orchestrator that runs it across every pending file with one credential.

pub mod file_pipeline;
pub mod orchestrator;

#[cfg(test)]
pub mod test_helpers;

pub use file_pipeline::{run_file_pipeline, FilePipelineResult, PipelineServices};
pub use orchestrator::{BatchState, IngestionOrchestrator, OrchestratorOptions};
