use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::private_files::dtos::MAX_FILE_SIZE;
use crate::features::private_files::handlers::{delete_file, serve_file, upload_file};
use crate::features::private_files::services::GatedFileService;

/// The gated serving route. Mounted at the application root so resolved
/// URLs are exactly `/<app>/<model>/<field>/<pk>/<filename>`.
pub fn serve_routes(service: Arc<GatedFileService>) -> Router {
    Router::new()
        .route(
            "/{app_label}/{model_name}/{field_name}/{pk}/{filename}",
            get(serve_file),
        )
        .with_state(service)
}

/// Ingestion routes for uploading and deleting field files.
pub fn api_routes(service: Arc<GatedFileService>) -> Router {
    Router::new()
        .route(
            "/api/files/{app_label}/{model_name}/{field_name}/{pk}",
            // Allow body size up to MAX_FILE_SIZE + buffer for multipart overhead
            post(upload_file)
                .delete(delete_file)
                .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024)),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::private_files::descriptor::{FieldDescriptor, FieldRegistry};
    use crate::features::private_files::dtos::FileResponseDto;
    use crate::features::private_files::services::{
        AccessTokenService, InMemoryReferenceStore,
    };
    use crate::modules::cache::InMemoryTokenCache;
    use crate::modules::storage::{FileStorage, LocalStorage};
    use crate::shared::test_helpers::with_authenticated_user;
    use crate::shared::types::ApiResponse;
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use std::time::Duration;

    fn registry() -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        registry
            .register(
                "documents",
                "report",
                "scan",
                FieldDescriptor::new("reports"),
            )
            .register(
                "documents",
                "report",
                "preview",
                FieldDescriptor::new("previews").with_attachment(false),
            )
            .register(
                "billing",
                "invoice",
                "pdf",
                FieldDescriptor::new("invoices").with_single_use(true),
            );
        registry
    }

    fn service() -> (tempfile::TempDir, Arc<GatedFileService>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::Local(LocalStorage::new(dir.path())));
        let tokens = Arc::new(AccessTokenService::new(
            Arc::new(InMemoryTokenCache::new()),
            Duration::from_secs(3600),
        ));
        let service = Arc::new(GatedFileService::new(
            Arc::new(registry()),
            Arc::new(InMemoryReferenceStore::new()),
            storage,
            tokens,
            None,
        ));
        (dir, service)
    }

    fn authed_server(service: Arc<GatedFileService>) -> TestServer {
        TestServer::new(with_authenticated_user(serve_routes(service))).unwrap()
    }

    fn anonymous_server(service: Arc<GatedFileService>) -> TestServer {
        TestServer::new(serve_routes(service)).unwrap()
    }

    async fn upload(
        service: &GatedFileService,
        field_name: &str,
        pk: &str,
        filename: &str,
        data: &[u8],
    ) -> FileResponseDto {
        let (app_label, model_name) = match field_name {
            "pdf" => ("billing", "invoice"),
            _ => ("documents", "report"),
        };
        service
            .upload(
                app_label,
                model_name,
                field_name,
                pk,
                filename,
                "application/pdf",
                data.to_vec(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_authenticated_caller_downloads_the_file() {
        let (_dir, service) = service();
        let uploaded = upload(&service, "scan", "1", "a.pdf", b"pdf bytes").await;
        assert_eq!(uploaded.url, "/documents/report/scan/1/a.pdf");

        let server = authed_server(service);
        let response = server.get(&uploaded.url).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.as_bytes().as_ref(), b"pdf bytes".as_slice());
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"a.pdf\""
        );
        assert_eq!(response.header("content-type"), "application/pdf");
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_rejected_by_default_condition() {
        let (_dir, service) = service();
        let uploaded = upload(&service, "scan", "1", "a.pdf", b"pdf bytes").await;

        let server = anonymous_server(service);
        let response = server.get(&uploaded.url).await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], serde_json::json!(false));
    }

    #[tokio::test]
    async fn test_inline_fields_render_inline() {
        let (_dir, service) = service();
        let uploaded = upload(&service, "preview", "1", "p.pdf", b"preview").await;

        let server = authed_server(service);
        let response = server.get(&uploaded.url).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            response.header("content-disposition"),
            "inline; filename=\"p.pdf\""
        );
    }

    #[tokio::test]
    async fn test_single_use_url_works_exactly_once() {
        let (_dir, service) = service();
        let uploaded = upload(&service, "pdf", "7", "invoice.pdf", b"invoice").await;
        assert!(uploaded.url.contains("?access-key="));

        let server = authed_server(service);

        let first = server.get(&uploaded.url).await;
        assert_eq!(first.status_code(), StatusCode::OK);

        // The key was consumed by the first request
        let second = server.get(&uploaded.url).await;
        assert_eq!(second.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_single_use_field_requires_the_key() {
        let (_dir, service) = service();
        upload(&service, "pdf", "7", "invoice.pdf", b"invoice").await;

        let server = authed_server(service);
        let response = server.get("/billing/invoice/pdf/7/invoice.pdf").await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_field_is_not_found() {
        let (_dir, service) = service();

        let server = authed_server(service);
        let response = server.get("/documents/report/nope/1/a.pdf").await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_filename_mismatch_is_not_found() {
        let (_dir, service) = service();
        upload(&service, "scan", "1", "a.pdf", b"pdf bytes").await;

        let server = authed_server(service);
        let response = server.get("/documents/report/scan/1/other.pdf").await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_shaped_filename_is_rejected() {
        let (_dir, service) = service();

        let server = authed_server(service);
        let response = server.get("/documents/report/scan/1/%2E%2E").await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_endpoint_round_trip() {
        let (_dir, service) = service();
        let server = TestServer::new(with_authenticated_user(
            api_routes(Arc::clone(&service)).merge(serve_routes(Arc::clone(&service))),
        ))
        .unwrap();

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"scanned".as_slice())
                .file_name("scan.pdf")
                .mime_type("application/pdf"),
        );

        let response = server
            .post("/api/files/documents/report/scan/3")
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let body: ApiResponse<FileResponseDto> = response.json();
        let uploaded = body.data.unwrap();
        assert_eq!(uploaded.filename, "scan.pdf");
        assert_eq!(uploaded.url, "/documents/report/scan/3/scan.pdf");

        let download = server.get(&uploaded.url).await;
        assert_eq!(download.status_code(), StatusCode::OK);
        assert_eq!(download.as_bytes().as_ref(), b"scanned".as_slice());
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_mime_type() {
        let (_dir, service) = service();
        let server = TestServer::new(with_authenticated_user(api_routes(service))).unwrap();

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"#!/bin/sh".as_slice())
                .file_name("run.sh")
                .mime_type("application/x-sh"),
        );

        let response = server
            .post("/api/files/documents/report/scan/3")
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_endpoint_removes_file_and_reference() {
        let (_dir, service) = service();
        let uploaded = upload(&service, "scan", "5", "gone.pdf", b"bytes").await;

        let server = TestServer::new(with_authenticated_user(
            api_routes(Arc::clone(&service)).merge(serve_routes(Arc::clone(&service))),
        ))
        .unwrap();

        let deleted = server.delete("/api/files/documents/report/scan/5").await;
        assert_eq!(deleted.status_code(), StatusCode::OK);

        let after = server.get(&uploaded.url).await;
        assert_eq!(after.status_code(), StatusCode::NOT_FOUND);
    }
}
