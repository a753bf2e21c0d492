use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::private_files::dtos::{
    is_mime_type_allowed, DeleteFileResponseDto, FileResponseDto, UploadFileDto,
    ALLOWED_MIME_TYPES, MAX_FILE_SIZE,
};
use crate::features::private_files::services::GatedFileService;
use crate::shared::types::ApiResponse;

/// Upload a file for a record field
///
/// Accepts multipart/form-data with a single `file` part. The target field
/// must be registered; the stored path is derived from the field's
/// `upload_to` prefix, the record pk and the original filename.
#[utoipa::path(
    post,
    path = "/api/files/{app_label}/{model_name}/{field_name}/{pk}",
    tag = "files",
    params(
        ("app_label" = String, Path, description = "App label of the owning record"),
        ("model_name" = String, Path, description = "Lowercase model name of the owning record"),
        ("field_name" = String, Path, description = "File field name"),
        ("pk" = String, Path, description = "Primary key of the owning record"),
    ),
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid file or validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Unknown file field"),
        (status = 413, description = "File too large")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(service): State<Arc<GatedFileService>>,
    Path((app_label, model_name, field_name, pk)): Path<(String, String, String, String)>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;

    // Process multipart fields
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_label = field.name().unwrap_or("").to_string();

        match field_label.as_str() {
            "file" => {
                let ct = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let fname = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                file_data = Some(data.to_vec());
                file_name = Some(fname);
                content_type = Some(ct);
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_label);
            }
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| AppError::BadRequest("Filename is required".to_string()))?;
    let content_type =
        content_type.ok_or_else(|| AppError::BadRequest("Content type is required".to_string()))?;

    if file_data.len() > MAX_FILE_SIZE {
        return Err(AppError::BadRequest(format!(
            "File too large. Maximum size is {} bytes ({} MB)",
            MAX_FILE_SIZE,
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }

    if !is_mime_type_allowed(&content_type) {
        return Err(AppError::BadRequest(format!(
            "File type '{}' is not allowed. Allowed types: {}",
            content_type,
            ALLOWED_MIME_TYPES.join(", ")
        )));
    }

    debug!(
        "Upload of '{}' to {}.{}.{} pk={} by {}",
        file_name, app_label, model_name, field_name, pk, user.sub
    );

    let response = service
        .upload(
            &app_label,
            &model_name,
            &field_name,
            &pk,
            &file_name,
            &content_type,
            file_data,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), None)),
    ))
}

/// Delete a record field's file
///
/// Removes the stored object and its reference row.
#[utoipa::path(
    delete,
    path = "/api/files/{app_label}/{model_name}/{field_name}/{pk}",
    tag = "files",
    params(
        ("app_label" = String, Path, description = "App label of the owning record"),
        ("model_name" = String, Path, description = "Lowercase model name of the owning record"),
        ("field_name" = String, Path, description = "File field name"),
        ("pk" = String, Path, description = "Primary key of the owning record"),
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = ApiResponse<DeleteFileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<GatedFileService>>,
    Path((app_label, model_name, field_name, pk)): Path<(String, String, String, String)>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    debug!(
        "Delete of {}.{}.{} pk={} by {}",
        app_label, model_name, field_name, pk, user.sub
    );

    service
        .delete(&app_label, &model_name, &field_name, &pk)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted: true }),
        Some("File deleted successfully".to_string()),
    )))
}
