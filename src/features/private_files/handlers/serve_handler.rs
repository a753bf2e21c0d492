use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::Response,
};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::auth::model::AccessContext;
use crate::features::private_files::dtos::ServeFileQuery;
use crate::features::private_files::services::GatedFileService;

/// Serve a gated file
///
/// The file reference is re-derived from the URL path components alone.
/// Fields flagged single-use require a valid `access-key` query parameter,
/// which is consumed on first use. The field's authorization condition is
/// evaluated on every request.
#[utoipa::path(
    get,
    path = "/{app_label}/{model_name}/{field_name}/{pk}/{filename}",
    tag = "gated-files",
    params(
        ("app_label" = String, Path, description = "App label of the owning record"),
        ("model_name" = String, Path, description = "Lowercase model name of the owning record"),
        ("field_name" = String, Path, description = "File field name"),
        ("pk" = String, Path, description = "Primary key of the owning record"),
        ("filename" = String, Path, description = "Stored filename"),
        ServeFileQuery,
    ),
    responses(
        (status = 200, description = "File content with the configured disposition"),
        (status = 400, description = "Malformed path component or missing access key"),
        (status = 403, description = "Condition rejected the caller or the access key is spent"),
        (status = 404, description = "Unknown field or no file for this record")
    )
)]
pub async fn serve_file(
    ctx: AccessContext,
    State(service): State<Arc<GatedFileService>>,
    Path((app_label, model_name, field_name, pk, filename)): Path<(
        String,
        String,
        String,
        String,
        String,
    )>,
    Query(query): Query<ServeFileQuery>,
) -> Result<Response, AppError> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let served = service
        .serve(
            &ctx,
            &app_label,
            &model_name,
            &field_name,
            &pk,
            &filename,
            query.access_key.as_deref(),
        )
        .await?;

    Response::builder()
        .header(header::CONTENT_TYPE, served.content_type.clone())
        .header(header::CONTENT_DISPOSITION, served.content_disposition())
        .body(Body::from(served.data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
