pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::RelayConfig;
use crate::services::pipeline::ArchivePipeline;
use crate::services::relay::UploadRelay;
use axum::{
    Json, Router,
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::process::process_archive,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::ProcessRequest,
            models::FileRef,
            models::BatchResult,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "process", description = "Archive extraction and relay"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub pipeline: Arc<ArchivePipeline>,
}

impl AppState {
    pub fn new(config: RelayConfig, relay: Arc<dyn UploadRelay>) -> Self {
        let config = Arc::new(config);
        let pipeline = Arc::new(ArchivePipeline::new(config.clone(), relay));
        Self { config, pipeline }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::handlers::health::root))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/process", post(api::handlers::process::process_archive))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_request_size,
        ))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
