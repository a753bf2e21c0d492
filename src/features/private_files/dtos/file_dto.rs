use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Query parameters accepted by the gated serving endpoint.
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct ServeFileQuery {
    /// Single-use access key minted at URL-resolution time
    #[serde(rename = "access-key")]
    #[validate(length(equal = 32, message = "access-key must be 32 characters"))]
    pub access_key: Option<String>,
}

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Response DTO for file operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    /// Unique identifier for the file reference
    pub id: Uuid,
    /// App label of the owning record
    pub app_label: String,
    /// Lowercase model name of the owning record
    pub model_name: String,
    /// Field the file is bound to
    pub field_name: String,
    /// Primary key of the owning record
    pub pk: String,
    /// Filename as stored
    pub filename: String,
    /// MIME type of the file
    pub content_type: String,
    /// Size of the file in bytes
    pub file_size: i64,
    /// Resolved URL: pre-signed when remote storage is active, gated otherwise
    pub url: String,
    /// Timestamp when the file was uploaded
    pub created_at: DateTime<Utc>,
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// Confirmation that the file was deleted
    pub deleted: bool,
}

/// Allowed MIME types for file uploads
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/zip",
];

/// Maximum file size in bytes (10MB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Check if a MIME type is allowed
pub fn is_mime_type_allowed(content_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&content_type)
}
