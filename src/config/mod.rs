use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the extract-and-relay service
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the downstream ingestion service (default: "http://localhost:8200")
    pub downstream_url: String,

    /// Root directory that request `file.path` values are resolved against
    pub data_root: PathBuf,

    /// Directory under which per-request staging directories are created
    pub staging_root: PathBuf,

    /// Timeout for a single outbound upload (default: 60 s)
    pub upload_timeout: Duration,

    /// Maximum accepted inbound request body in bytes (default: 1 MB)
    pub max_request_size: usize,

    /// Orphaned staging directories older than this are swept (default: 24)
    pub staging_cleanup_age_hours: u64,

    /// Allowed CORS origins (comma separated); empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            downstream_url: "http://localhost:8200".to_string(),
            data_root: PathBuf::new(),
            staging_root: env::temp_dir().join("archive-relay"),
            upload_timeout: Duration::from_secs(60),
            max_request_size: 1024 * 1024, // 1 MB
            staging_cleanup_age_hours: 24,
            allowed_origins: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            downstream_url: env::var("MD_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.downstream_url),

            data_root: env::var("MD_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.data_root),

            staging_root: env::var("STAGING_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.staging_root),

            upload_timeout: env::var("UPLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.upload_timeout),

            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),

            staging_cleanup_age_hours: parse_cleanup_age_hours(
                env::var("STAGING_CLEANUP_AGE_HOURS").ok().as_deref(),
                default.staging_cleanup_age_hours,
            ),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for local development and tests (short timeouts, explicit roots)
    pub fn development(data_root: impl Into<PathBuf>, staging_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            staging_root: staging_root.into(),
            upload_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Minimum age before the sweeper removes an orphaned staging directory
    pub fn staging_cleanup_age(&self) -> Duration {
        Duration::from_secs(self.staging_cleanup_age_hours.saturating_mul(3600))
    }

    /// Full URL of the downstream file ingestion endpoint
    pub fn upload_endpoint(&self) -> String {
        format!("{}/api/nomad/process/files", self.downstream_url)
    }
}

/// Zero would let the sweeper delete directories of in-flight requests, so it
/// falls back to the default along with unparsable values.
fn parse_cleanup_age_hours(value: Option<&str>, default: u64) -> u64 {
    match value.and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(0) => {
            tracing::warn!("STAGING_CLEANUP_AGE_HOURS must be positive, using {}", default);
            default
        }
        Some(hours) => hours,
        None => default,
    }
}
