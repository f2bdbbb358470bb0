use mime::Mime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Inbound job description, as uploaded in the `request` part of `POST /process`.
///
/// Every field is optional at the parsing stage so that validation can report
/// exactly which required field is missing.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProcessRequest {
    pub file: Option<FileRef>,
    pub target: Option<String>,
    #[serde(rename = "outputSet", alias = "output_set")]
    pub output_set: Option<String>,
    #[schema(value_type = Object)]
    pub process: Option<Value>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FileRef {
    /// Archive location relative to the configured data root
    pub path: Option<String>,
}

/// A `ProcessRequest` that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub archive_path: String,
    pub process: Value,
    pub output_set: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Text,
    File,
}

/// One archive member that passed the allow-list and now lives in staging.
#[derive(Debug, Clone)]
pub struct ExtractedEntry {
    /// Name as recorded in the archive
    pub name: String,
    /// Absolute location inside the staging directory
    pub path: PathBuf,
    pub content_type: Mime,
    pub category: FileCategory,
}

/// Metadata accompanying each relayed file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub file: EnvelopeFile,
    pub target: String,
    pub process: Value,
    pub output_set: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub total_files: usize,
    pub current_file: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeFile {
    pub path: String,
    #[serde(rename = "type")]
    pub category: FileCategory,
    pub extension: String,
    pub label: String,
}

/// Aggregate outcome of one `POST /process` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct BatchResult {
    /// Wall-clock seconds, rounded to one decimal
    pub execution_time: f64,
    pub total_files: usize,
    /// Number of files the relay loop attempted
    pub current_file: usize,
    pub successful_uploads: usize,
}
