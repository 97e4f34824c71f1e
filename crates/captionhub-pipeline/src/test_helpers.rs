//! In-memory collaborators for exercising the pipeline without HTTP.
//!
//! Every mock records the calls it receives so tests can assert on call
//! counts and on the identifiers threaded between steps.

use async_trait::async_trait;
use captionhub_core::{
    AssetId, AssetUploader, CaptionGenerator, Credential, IngestError, IngestResult,
    MetadataWriter, PendingFile, TokenProvider, UploadStep,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCall {
    Acquire,
    Upload {
        file_name: String,
        token: String,
    },
    Caption {
        file_name: String,
    },
    AttachCaption {
        asset_id: String,
        caption: String,
        token: String,
    },
}

type CallLog = Arc<Mutex<Vec<PipelineCall>>>;

fn record(log: &CallLog, call: PipelineCall) {
    log.lock().unwrap_or_else(PoisonError::into_inner).push(call);
}

fn snapshot(log: &CallLog) -> Vec<PipelineCall> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

#[derive(Clone)]
pub struct MockTokenProvider {
    token: Option<String>,
    calls: CallLog,
}

impl MockTokenProvider {
    pub fn new(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            calls: CallLog::default(),
        }
    }

    /// Every `acquire` fails with an auth error
    pub fn failing() -> Self {
        Self {
            token: None,
            calls: CallLog::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        snapshot(&self.calls).len()
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn acquire(&self) -> IngestResult<Credential> {
        record(&self.calls, PipelineCall::Acquire);
        match &self.token {
            Some(token) => Ok(Credential::new(token.clone())),
            None => Err(IngestError::auth(anyhow::anyhow!(
                "API request failed with status 401 Unauthorized: invalid_client"
            ))),
        }
    }
}

/// Uploader that finalizes every file as `asset-{file_name}` unless told otherwise.
#[derive(Clone, Default)]
pub struct MockUploader {
    failures: Arc<HashMap<String, UploadStep>>,
    delays: Arc<HashMap<String, Duration>>,
    calls: CallLog,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, file_name: &str, step: UploadStep) -> Self {
        Arc::make_mut(&mut self.failures).insert(file_name.to_string(), step);
        self
    }

    /// Hold the upload of `file_name` for `delay` before answering.
    pub fn delay(mut self, file_name: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(file_name.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<PipelineCall> {
        snapshot(&self.calls)
    }

    /// Highest number of uploads observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetUploader for MockUploader {
    async fn upload(&self, file: &PendingFile, credential: &Credential) -> IngestResult<AssetId> {
        record(
            &self.calls,
            PipelineCall::Upload {
                file_name: file.file_name().to_string(),
                token: credential.token().to_string(),
            },
        );

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        // Always yield once so concurrent uploads overlap
        match self.delays.get(file.file_name()) {
            Some(delay) => tokio::time::sleep(*delay).await,
            None => tokio::task::yield_now().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(step) = self.failures.get(file.file_name()) {
            return Err(IngestError::upload(
                *step,
                file.file_name(),
                anyhow::anyhow!("mock {} failure", step),
            ));
        }

        Ok(AssetId::new(format!("asset-{}", file.file_name())))
    }
}

#[derive(Clone)]
pub struct MockCaptionGenerator {
    caption: Option<String>,
    calls: CallLog,
}

impl MockCaptionGenerator {
    pub fn with_caption(caption: &str) -> Self {
        Self {
            caption: Some(caption.to_string()),
            calls: CallLog::default(),
        }
    }

    /// Every `generate` fails with a caption error
    pub fn failing() -> Self {
        Self {
            caption: None,
            calls: CallLog::default(),
        }
    }

    pub fn calls(&self) -> Vec<PipelineCall> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl CaptionGenerator for MockCaptionGenerator {
    async fn generate(&self, file: &PendingFile) -> IngestResult<String> {
        record(
            &self.calls,
            PipelineCall::Caption {
                file_name: file.file_name().to_string(),
            },
        );
        match &self.caption {
            Some(caption) => Ok(caption.clone()),
            None => Err(IngestError::caption(anyhow::anyhow!(
                "OpenAI API request failed: 503 Service Unavailable"
            ))),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockMetadataWriter {
    fail: bool,
    delay: Option<Duration>,
    calls: CallLog,
}

impl MockMetadataWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Writes complete only after `delay`; used to show settlement does not wait.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PipelineCall> {
        snapshot(&self.calls)
    }

    pub fn captions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PipelineCall::AttachCaption { caption, .. } => Some(caption),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MetadataWriter for MockMetadataWriter {
    async fn attach_caption(
        &self,
        asset_id: &AssetId,
        caption: &str,
        credential: &Credential,
    ) -> IngestResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        record(
            &self.calls,
            PipelineCall::AttachCaption {
                asset_id: asset_id.to_string(),
                caption: caption.to_string(),
                token: credential.token().to_string(),
            },
        );

        if self.fail {
            return Err(IngestError::metadata(
                asset_id,
                anyhow::anyhow!("API request failed with status 403 Forbidden: forbidden"),
            ));
        }
        Ok(())
    }
}
