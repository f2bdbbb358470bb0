use crate::config::RelayConfig;
use crate::models::{Envelope, ExtractedEntry};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

/// Result of relaying one staged file
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    /// Downstream answered 200 with this JSON body
    Delivered(Value),
    /// Anything else; the batch carries on
    Failed { reason: String },
}

impl UploadOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, UploadOutcome::Delivered(_))
    }
}

/// Sends one staged file and its envelope to the ingestion service.
///
/// Implementations never fail the batch: every error becomes `UploadOutcome::Failed`.
#[async_trait::async_trait]
pub trait UploadRelay: Send + Sync {
    async fn relay(&self, entry: &ExtractedEntry, envelope: &Envelope) -> UploadOutcome;
}

/// Multipart POST to `{MD_URL}/api/nomad/process/files`
pub struct HttpUploadRelay {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploadRelay {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Self::new(config.upload_endpoint(), config.upload_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, entry: &ExtractedEntry, envelope: &Envelope) -> Result<UploadOutcome> {
        let content = tokio::fs::read(&entry.path)
            .await
            .with_context(|| format!("Failed to read staged file {}", entry.path.display()))?;
        let request_json = serde_json::to_string(envelope)?;

        let form = Form::new()
            .part(
                "content",
                Part::bytes(content)
                    .file_name(envelope.file.label.clone())
                    .mime_str(entry.content_type.essence_str())?,
            )
            .part(
                "request",
                Part::text(request_json)
                    .file_name("request.json")
                    .mime_str("application/json")?,
            );

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok(UploadOutcome::Failed {
                reason: format!("downstream returned {}", status),
            });
        }

        let body: Value = response
            .json()
            .await
            .context("Downstream response is not JSON")?;
        Ok(UploadOutcome::Delivered(body))
    }
}

#[async_trait::async_trait]
impl UploadRelay for HttpUploadRelay {
    async fn relay(&self, entry: &ExtractedEntry, envelope: &Envelope) -> UploadOutcome {
        tracing::debug!(
            "Uploading {} ({}/{}) to {}",
            entry.name,
            envelope.current_file,
            envelope.total_files,
            self.endpoint
        );

        match self.send(entry, envelope).await {
            Ok(UploadOutcome::Failed { reason }) => {
                tracing::warn!("Error uploading {}: {}", entry.name, reason);
                UploadOutcome::Failed { reason }
            }
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Error sending file {}: {:#}", entry.name, e);
                UploadOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnvelopeFile, FileCategory};
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UPLOAD_PATH: &str = "/api/nomad/process/files";

    fn staged(dir: &std::path::Path) -> (ExtractedEntry, Envelope) {
        let file_path = dir.join("note.txt");
        std::fs::write(&file_path, b"hello relay").unwrap();

        let entry = ExtractedEntry {
            name: "note.txt".to_string(),
            path: file_path.clone(),
            content_type: mime::TEXT_PLAIN,
            category: FileCategory::Text,
        };
        let envelope = Envelope {
            file: EnvelopeFile {
                path: file_path.to_string_lossy().into_owned(),
                category: FileCategory::Text,
                extension: ".txt".to_string(),
                label: "note.txt".to_string(),
            },
            target: "P1:2".to_string(),
            process: json!({"id": "#77:1"}),
            output_set: None,
            user_id: None,
            total_files: 1,
            current_file: 1,
        };
        (entry, envelope)
    }

    fn relay_for(server: &MockServer, timeout: Duration) -> HttpUploadRelay {
        HttpUploadRelay::new(format!("{}{}", server.uri(), UPLOAD_PATH), timeout).unwrap()
    }

    #[tokio::test]
    async fn test_delivered_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .and(body_string_contains("name=\"content\""))
            .and(body_string_contains("name=\"request\""))
            .and(body_string_contains("hello relay"))
            .and(body_string_contains("\"current_file\":1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"@rid": "#99:1"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (entry, envelope) = staged(dir.path());
        let outcome = relay_for(&server, Duration::from_secs(5))
            .relay(&entry, &envelope)
            .await;

        match outcome {
            UploadOutcome::Delivered(body) => assert_eq!(body["@rid"], "#99:1"),
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (entry, envelope) = staged(dir.path());
        let outcome = relay_for(&server, Duration::from_secs(5))
            .relay(&entry, &envelope)
            .await;

        assert!(!outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_failed_on_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (entry, envelope) = staged(dir.path());
        let outcome = relay_for(&server, Duration::from_millis(200))
            .relay(&entry, &envelope)
            .await;

        assert!(!outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_failed_when_staged_file_is_missing() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (mut entry, envelope) = staged(dir.path());
        entry.path = PathBuf::from("/definitely/not/here.txt");

        let outcome = relay_for(&server, Duration::from_secs(5))
            .relay(&entry, &envelope)
            .await;

        assert!(matches!(outcome, UploadOutcome::Failed { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_endpoint_from_config() {
        let mut config = RelayConfig::default();
        config.downstream_url = "http://md:8200".to_string();
        let relay = HttpUploadRelay::from_config(&config).unwrap();
        assert_eq!(relay.endpoint(), "http://md:8200/api/nomad/process/files");
    }
}
