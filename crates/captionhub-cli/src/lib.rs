use anyhow::Context;
use captionhub_caption::OpenAiCaptionGenerator;
use captionhub_core::{FileValidator, IngestConfig, PendingFile};
use captionhub_dam::DamClient;
use captionhub_pipeline::{IngestionOrchestrator, OrchestratorOptions, PipelineServices};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
///
/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to
/// structured output.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("captionhub=info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Wire the HTTP clients into an orchestrator.
pub fn build_orchestrator(config: &IngestConfig) -> anyhow::Result<IngestionOrchestrator> {
    let dam = Arc::new(
        DamClient::new(&config.dam, config.http_timeout()).context("Failed to build DAM client")?,
    );
    let captioner = Arc::new(
        OpenAiCaptionGenerator::new(&config.caption, config.http_timeout())
            .context("Failed to build caption client")?,
    );

    tracing::info!(
        dam_api_url = %dam.api_url(),
        caption_model = %config.caption.model,
        max_concurrency = ?config.max_concurrency,
        "Ingestion pipeline configured"
    );

    Ok(IngestionOrchestrator::new(
        dam.clone(),
        PipelineServices::new(dam.clone(), captioner, dam),
        FileValidator::from_limits(&config.limits),
    )
    .with_options(OrchestratorOptions {
        max_concurrency: config.max_concurrency,
    }))
}

/// Intake verdict for one path on the command line.
#[derive(Debug, Clone, Serialize)]
pub struct FileVerdict {
    pub path: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileVerdict {
    fn accepted(path: &Path, file: &PendingFile) -> Self {
        Self {
            path: path.display().to_string(),
            valid: true,
            content_type: Some(file.content_type().to_string()),
            size: Some(file.size()),
            error: None,
        }
    }

    fn rejected(path: &Path, error: String) -> Self {
        Self {
            path: path.display().to_string(),
            valid: false,
            content_type: None,
            size: None,
            error: Some(error),
        }
    }
}

/// Read one path, checking its size on disk before loading the bytes.
async fn load_file(path: &Path, validator: &FileValidator) -> Result<PendingFile, String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| format!("{:#}", e))?;
    validator
        .validate_file_size(metadata.len())
        .map_err(|e| e.to_string())?;

    PendingFile::from_path(path)
        .await
        .map_err(|e| format!("{:#}", e))
}

/// Read and validate one path. Unreadable files count as invalid.
pub async fn inspect_file(
    path: &Path,
    validator: &FileValidator,
) -> (FileVerdict, Option<PendingFile>) {
    let file = match load_file(path, validator).await {
        Ok(file) => file,
        Err(error) => return (FileVerdict::rejected(path, error), None),
    };

    match validator.validate(&file) {
        Ok(()) => (FileVerdict::accepted(path, &file), Some(file)),
        Err(e) => (FileVerdict::rejected(path, e.to_string()), None),
    }
}

pub async fn validate_paths(paths: &[PathBuf], validator: &FileValidator) -> Vec<FileVerdict> {
    let mut verdicts = Vec::with_capacity(paths.len());
    for path in paths {
        let (verdict, _) = inspect_file(path, validator).await;
        verdicts.push(verdict);
    }
    verdicts
}

/// Read every path into the batch.
///
/// An invalid file aborts unless `skip_invalid` is set, in which case it is
/// logged and left out. Returns the verdicts of skipped files.
pub async fn enqueue_paths(
    orchestrator: &mut IngestionOrchestrator,
    paths: &[PathBuf],
    skip_invalid: bool,
) -> anyhow::Result<Vec<FileVerdict>> {
    let mut skipped = Vec::new();

    for path in paths {
        let loaded = match load_file(path, orchestrator.validator()).await {
            Ok(file) => orchestrator.enqueue(file).map_err(|e| e.to_string()),
            Err(error) => Err(error),
        };

        if let Err(error) = loaded {
            if !skip_invalid {
                anyhow::bail!("{}: {}", path.display(), error);
            }
            tracing::warn!(path = %path.display(), error = %error, "Skipping invalid file");
            skipped.push(FileVerdict::rejected(path, error));
        }
    }

    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use captionhub_core::{CaptionConfig, DamConfig, FileLimits};
    use std::io::Write;

    const JPEG: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    fn orchestrator() -> IngestionOrchestrator {
        let config = IngestConfig::new(
            DamConfig::new("http://127.0.0.1:9", "id", "secret"),
            CaptionConfig::new("sk-test"),
        );
        build_orchestrator(&config).unwrap()
    }

    #[tokio::test]
    async fn test_validate_paths_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "ok.jpg", &JPEG);
        let gif = write_file(&dir, "fake.png", b"GIF89a");
        let missing = dir.path().join("missing.jpg");

        let verdicts =
            validate_paths(&[good, gif, missing], &FileValidator::default()).await;

        assert!(verdicts[0].valid);
        assert_eq!(verdicts[0].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(verdicts[0].size, Some(6));
        assert!(!verdicts[1].valid);
        assert!(verdicts[1].error.as_ref().unwrap().contains("image/gif"));
        assert!(!verdicts[2].valid);
        assert!(verdicts[2].error.as_ref().unwrap().contains("Failed to read file"));
    }

    #[tokio::test]
    async fn test_enqueue_paths_aborts_on_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "ok.jpg", &JPEG);
        let empty = write_file(&dir, "empty.jpg", &[]);
        let mut orchestrator = orchestrator();

        let err = enqueue_paths(&mut orchestrator, &[good, empty], false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("empty.jpg"));
    }

    #[tokio::test]
    async fn test_enqueue_paths_skips_invalid_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "ok.jpg", &JPEG);
        let text = write_file(&dir, "notes.txt", b"hello");
        let mut orchestrator = orchestrator();

        let skipped = enqueue_paths(&mut orchestrator, &[good, text], true)
            .await
            .unwrap();

        assert_eq!(skipped.len(), 1);
        assert!(!skipped[0].valid);
        assert_eq!(orchestrator.pending_files().len(), 1);
        assert_eq!(orchestrator.pending_files()[0].file_name(), "ok.jpg");
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_from_its_size_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = JPEG.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let big = write_file(&dir, "big.jpg", &bytes);
        let validator = FileValidator::from_limits(&FileLimits {
            max_file_size_bytes: 16,
            ..FileLimits::default()
        });

        let (verdict, file) = inspect_file(&big, &validator).await;

        assert!(!verdict.valid);
        assert!(file.is_none());
        assert!(verdict.error.as_ref().unwrap().contains("38"));
        assert!(verdict.error.as_ref().unwrap().contains("16"));
    }

    #[tokio::test]
    async fn test_enqueue_paths_skips_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "ok.jpg", &JPEG);
        let big = write_file(&dir, "big.jpg", &vec![0xFF; 6 * 1024 * 1024]);
        let mut orchestrator = orchestrator();

        let skipped = enqueue_paths(&mut orchestrator, &[good, big], true)
            .await
            .unwrap();

        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].path.ends_with("big.jpg"));
        assert_eq!(orchestrator.pending_files().len(), 1);
    }

    #[test]
    fn test_rejected_verdict_omits_file_details() {
        let verdict = FileVerdict::rejected(Path::new("a.bmp"), "bad".to_string());
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "path": "a.bmp", "valid": false, "error": "bad" })
        );
    }
}
