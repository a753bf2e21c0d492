use std::sync::Arc;

use tracing::{debug, info};

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AccessContext;
use crate::features::private_files::descriptor::FieldRegistry;
use crate::features::private_files::dtos::FileResponseDto;
use crate::features::private_files::models::NewFileReference;
use crate::features::private_files::services::{
    AccessTokenService, FileReferenceStore, UrlResolver,
};
use crate::modules::storage::FileStorage;
use crate::shared::validation::{is_safe_filename, ACCESS_KEY_REGEX, COMPONENT_REGEX};

/// A file ready to be written to the response body.
#[derive(Debug)]
pub struct ServedFile {
    pub data: Vec<u8>,
    pub content_type: String,
    pub filename: String,
    pub attachment: bool,
}

impl ServedFile {
    /// `Content-Disposition` header value for this file.
    pub fn content_disposition(&self) -> String {
        let kind = if self.attachment {
            "attachment"
        } else {
            "inline"
        };
        // Quotes and backslashes would break the quoted-string form
        let filename = self.filename.replace(['"', '\\'], "_");
        format!("{}; filename=\"{}\"", kind, filename)
    }
}

/// Orchestrates gated file operations: serving, ingestion, deletion.
pub struct GatedFileService {
    registry: Arc<FieldRegistry>,
    store: Arc<dyn FileReferenceStore>,
    storage: Arc<FileStorage>,
    tokens: Arc<AccessTokenService>,
    resolver: UrlResolver,
}

impl GatedFileService {
    pub fn new(
        registry: Arc<FieldRegistry>,
        store: Arc<dyn FileReferenceStore>,
        storage: Arc<FileStorage>,
        tokens: Arc<AccessTokenService>,
        presign_expiry_secs: Option<u32>,
    ) -> Self {
        let resolver = UrlResolver::new(
            Arc::clone(&storage),
            Arc::clone(&tokens),
            presign_expiry_secs,
        );
        Self {
            registry,
            store,
            storage,
            tokens,
            resolver,
        }
    }

    /// Serve one gated request: re-derive the reference from path
    /// components, enforce the single-use key and the field condition,
    /// then read the bytes.
    pub async fn serve(
        &self,
        ctx: &AccessContext,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
        filename: &str,
        access_key: Option<&str>,
    ) -> Result<ServedFile> {
        let model_name = validate_components(app_label, model_name, field_name, pk)?;
        if !is_safe_filename(filename) {
            return Err(AppError::BadRequest("Invalid filename".to_string()));
        }

        let descriptor = self
            .registry
            .get(app_label, &model_name, field_name)
            .ok_or_else(|| AppError::NotFound("Unknown file field".to_string()))?;

        let file = self
            .store
            .get(app_label, &model_name, field_name, pk)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if file.filename() != filename {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        if descriptor.single_use() {
            let key = access_key.ok_or_else(|| {
                AppError::BadRequest("This file requires an access-key parameter".to_string())
            })?;
            if !ACCESS_KEY_REGEX.is_match(key) {
                return Err(AppError::BadRequest("Malformed access-key".to_string()));
            }
            // Consuming removes the entry; a replayed key lands here as None
            match self.tokens.consume(key).await? {
                Some(value) if value == file.token_descriptor() => {}
                _ => {
                    return Err(AppError::Forbidden(
                        "Invalid or expired access key".to_string(),
                    ))
                }
            }
        }

        if !descriptor.evaluate(ctx, &file).await {
            return Err(AppError::Forbidden(
                "You are not allowed to access this file".to_string(),
            ));
        }

        let data = self.storage.read(&file.stored_path).await?;

        debug!(
            "Serving {} ({} bytes) for {}.{} pk={}",
            file.filename(),
            data.len(),
            app_label,
            model_name,
            pk
        );

        Ok(ServedFile {
            data,
            content_type: file.content_type.clone(),
            filename: file.filename().to_string(),
            attachment: descriptor.attachment(),
        })
    }

    /// Store uploaded bytes for a record field and record the reference.
    /// Returns metadata including the resolved URL.
    pub async fn upload(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<FileResponseDto> {
        let model_name = validate_components(app_label, model_name, field_name, pk)?;
        if !is_safe_filename(filename) {
            return Err(AppError::BadRequest("Invalid filename".to_string()));
        }

        let descriptor = self
            .registry
            .get(app_label, &model_name, field_name)
            .ok_or_else(|| AppError::NotFound("Unknown file field".to_string()))?;

        let stored_path = if descriptor.upload_to().is_empty() {
            format!("{}/{}", pk, filename)
        } else {
            format!("{}/{}/{}", descriptor.upload_to(), pk, filename)
        };

        let file_size = data.len() as i64;
        self.storage.write(&stored_path, &data, content_type).await?;

        let reference = self
            .store
            .upsert(NewFileReference {
                app_label: app_label.to_string(),
                model_name: model_name.clone(),
                field_name: field_name.to_string(),
                pk: pk.to_string(),
                stored_path,
                content_type: content_type.to_string(),
                file_size,
            })
            .await?;

        let url = self.resolver.resolve(&reference, &descriptor).await?;

        info!(
            "File stored: {}.{}.{} pk={} path={} size={}",
            app_label, model_name, field_name, pk, reference.stored_path, file_size
        );

        Ok(FileResponseDto {
            id: reference.id,
            app_label: reference.app_label,
            model_name: reference.model_name,
            field_name: reference.field_name,
            pk: reference.pk,
            filename: filename.to_string(),
            content_type: reference.content_type,
            file_size: reference.file_size,
            url,
            created_at: reference.created_at,
        })
    }

    /// Delete the stored object and its reference.
    pub async fn delete(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
    ) -> Result<()> {
        let model_name = validate_components(app_label, model_name, field_name, pk)?;

        let file = self
            .store
            .get(app_label, &model_name, field_name, pk)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        self.storage.delete(&file.stored_path).await?;
        self.store
            .delete(app_label, &model_name, field_name, pk)
            .await?;

        info!(
            "File deleted: {}.{}.{} pk={} path={}",
            app_label, model_name, field_name, pk, file.stored_path
        );

        Ok(())
    }
}

/// Validate URL path components; returns the normalized model name.
fn validate_components(
    app_label: &str,
    model_name: &str,
    field_name: &str,
    pk: &str,
) -> Result<String> {
    let model_name = model_name.to_lowercase();
    for name in [app_label, model_name.as_str(), field_name] {
        if !COMPONENT_REGEX.is_match(name) {
            return Err(AppError::BadRequest(format!(
                "Invalid path component: '{}'",
                name
            )));
        }
    }
    // The pk becomes both a URL segment and a storage path segment
    if !is_safe_filename(pk) {
        return Err(AppError::BadRequest(format!("Invalid pk: '{}'", pk)));
    }
    Ok(model_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_attachment_and_inline() {
        let attached = ServedFile {
            data: vec![],
            content_type: "application/pdf".to_string(),
            filename: "a.pdf".to_string(),
            attachment: true,
        };
        assert_eq!(attached.content_disposition(), "attachment; filename=\"a.pdf\"");

        let inline = ServedFile {
            attachment: false,
            ..attached
        };
        assert_eq!(inline.content_disposition(), "inline; filename=\"a.pdf\"");
    }

    #[test]
    fn test_content_disposition_sanitizes_quotes() {
        let served = ServedFile {
            data: vec![],
            content_type: "text/plain".to_string(),
            filename: "we\"ird.txt".to_string(),
            attachment: true,
        };
        assert_eq!(
            served.content_disposition(),
            "attachment; filename=\"we_ird.txt\""
        );
    }

    #[test]
    fn test_validate_components() {
        assert!(validate_components("documents", "Report", "scan", "42").is_ok());
        assert_eq!(
            validate_components("documents", "Report", "scan", "42").unwrap(),
            "report"
        );
        assert!(validate_components("Bad-App", "report", "scan", "42").is_err());
        assert!(validate_components("documents", "report", "scan", "..").is_err());
        assert!(validate_components("documents", "report", "scan", "a/b").is_err());
    }
}
