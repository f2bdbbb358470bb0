use crate::AppState;
use crate::api::error::AppError;
use crate::models::BatchResult;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use bytes::Bytes;

/// Name of the multipart part carrying the `ProcessRequest` JSON
const REQUEST_FIELD: &str = "request";

#[utoipa::path(
    post,
    path = "/process",
    request_body(
        content = Vec<u8>,
        description = "Multipart form with a `request` part holding the ProcessRequest JSON",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Archive extracted and relayed", body = BatchResult),
        (status = 400, description = "Invalid request or corrupted archive"),
        (status = 404, description = "Archive not found"),
        (status = 500, description = "Processing failed")
    ),
    tag = "process"
)]
pub async fn process_archive(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, AppError> {
    let mut payload: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(REQUEST_FIELD) {
            payload = Some(field.bytes().await.map_err(multipart_error)?);
        }
    }

    let payload = payload.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field: {}", REQUEST_FIELD))
    })?;

    let result = state.pipeline.process_detached(payload).await?;
    Ok(Json(result))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}
