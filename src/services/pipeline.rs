use crate::api::error::AppError;
use crate::config::RelayConfig;
use crate::models::{BatchResult, ExtractedEntry, ProcessRequest, ValidatedRequest};
use crate::services::archive;
use crate::services::metadata::MetadataBuilder;
use crate::services::relay::UploadRelay;
use crate::services::staging::StagingDirectory;
use crate::utils::validation::{project_id_from_path, resolve_archive_path, validate_request};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Extract-and-relay orchestrator: one instance serves every request.
pub struct ArchivePipeline {
    config: Arc<RelayConfig>,
    relay: Arc<dyn UploadRelay>,
}

struct BatchCounts {
    total_files: usize,
    attempted: usize,
    successful: usize,
}

impl ArchivePipeline {
    pub fn new(config: Arc<RelayConfig>, relay: Arc<dyn UploadRelay>) -> Self {
        Self { config, relay }
    }

    /// Runs [`Self::process`] on its own task so a dropped client connection
    /// cannot interrupt the batch or its staging cleanup.
    pub async fn process_detached(
        self: &Arc<Self>,
        payload: Bytes,
    ) -> Result<BatchResult, AppError> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.process(&payload).await })
            .await
            .map_err(|e| AppError::Internal(format!("Processing task failed: {}", e)))?
    }

    pub async fn process(&self, payload: &[u8]) -> Result<BatchResult, AppError> {
        let started = Instant::now();

        let request: ProcessRequest = serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Invalid request JSON: {}", e)))?;
        let request = validate_request(request)?;

        let archive_path = resolve_archive_path(&self.config.data_root, &request.archive_path)?;
        let project_id = project_id_from_path(&request.archive_path)?;
        tracing::info!(
            archive = %archive_path.display(),
            project = %project_id,
            output_set = ?request.output_set,
            "Processing archive"
        );

        match tokio::fs::try_exists(&archive_path).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(AppError::NotFound(format!(
                    "Archive not found: {}",
                    request.archive_path
                )));
            }
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Cannot access archive {}: {}",
                    request.archive_path, e
                )));
            }
        }

        let staging = StagingDirectory::create(&self.config.staging_root).map_err(|e| {
            AppError::Internal(format!("Failed to create staging directory: {}", e))
        })?;

        let counts = self
            .extract_and_relay(staging.path(), &archive_path, &request, &project_id)
            .await;

        if let Err(e) = staging.close() {
            tracing::warn!("Failed to clean up staging directory: {}", e);
        }
        let counts = counts?;

        let result = BatchResult {
            execution_time: round_to_tenths(started.elapsed()),
            total_files: counts.total_files,
            current_file: counts.attempted,
            successful_uploads: counts.successful,
        };
        tracing::info!(
            "Relayed {}/{} files for project {} in {}s",
            result.successful_uploads,
            result.total_files,
            project_id,
            result.execution_time
        );
        Ok(result)
    }

    async fn extract_and_relay(
        &self,
        staging_dir: &Path,
        archive_path: &Path,
        request: &ValidatedRequest,
        project_id: &str,
    ) -> Result<BatchCounts, AppError> {
        let entries = self.extract(archive_path, staging_dir).await?;
        let total_files = entries.len();

        let mut counts = BatchCounts {
            total_files,
            attempted: 0,
            successful: 0,
        };

        for (index, entry) in entries.iter().enumerate() {
            let envelope =
                MetadataBuilder::envelope(entry, request, project_id, index + 1, total_files);
            let outcome = self.relay.relay(entry, &envelope).await;

            counts.attempted = index + 1;
            if outcome.is_delivered() {
                counts.successful += 1;
            }
        }

        Ok(counts)
    }

    async fn extract(
        &self,
        archive_path: &Path,
        staging_dir: &Path,
    ) -> Result<Vec<ExtractedEntry>, AppError> {
        let archive_path = archive_path.to_path_buf();
        let staging_dir = staging_dir.to_path_buf();

        let entries = tokio::task::spawn_blocking(move || {
            archive::extract_allowed(&archive_path, &staging_dir)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Extraction task failed: {}", e)))??;

        tracing::info!("Extracted {} allow-listed files", entries.len());
        Ok(entries)
    }
}

fn round_to_tenths(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10.0).round() / 10.0
}
