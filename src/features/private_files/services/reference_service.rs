use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::private_files::models::{FileReference, NewFileReference};

/// Lookup and persistence for file references.
///
/// The serving view re-derives references from URL path components alone,
/// so the store is keyed by (app_label, model_name, field_name, pk).
#[async_trait]
pub trait FileReferenceStore: Send + Sync {
    async fn get(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
    ) -> Result<Option<FileReference>>;

    /// Insert the reference, replacing any previous file for the same field.
    async fn upsert(&self, reference: NewFileReference) -> Result<FileReference>;

    /// Remove the reference; returns whether a row existed.
    async fn delete(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
    ) -> Result<bool>;
}

/// PostgreSQL-backed reference store.
pub struct PgReferenceStore {
    pool: PgPool,
}

impl PgReferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileReferenceStore for PgReferenceStore {
    async fn get(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
    ) -> Result<Option<FileReference>> {
        let reference = sqlx::query_as::<_, FileReference>(
            r#"
            SELECT id, app_label, model_name, field_name, pk,
                   stored_path, content_type, file_size, created_at
            FROM file_references
            WHERE app_label = $1 AND model_name = $2 AND field_name = $3 AND pk = $4
            "#,
        )
        .bind(app_label)
        .bind(model_name)
        .bind(field_name)
        .bind(pk)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reference)
    }

    async fn upsert(&self, reference: NewFileReference) -> Result<FileReference> {
        let row = sqlx::query_as::<_, FileReference>(
            r#"
            INSERT INTO file_references
                (id, app_label, model_name, field_name, pk, stored_path, content_type, file_size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (app_label, model_name, field_name, pk)
            DO UPDATE SET
                stored_path = EXCLUDED.stored_path,
                content_type = EXCLUDED.content_type,
                file_size = EXCLUDED.file_size
            RETURNING id, app_label, model_name, field_name, pk,
                      stored_path, content_type, file_size, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&reference.app_label)
        .bind(&reference.model_name)
        .bind(&reference.field_name)
        .bind(&reference.pk)
        .bind(&reference.stored_path)
        .bind(&reference.content_type)
        .bind(reference.file_size)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM file_references
            WHERE app_label = $1 AND model_name = $2 AND field_name = $3 AND pk = $4
            "#,
        )
        .bind(app_label)
        .bind(model_name)
        .bind(field_name)
        .bind(pk)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryReferenceStore {
    rows: tokio::sync::Mutex<
        std::collections::HashMap<(String, String, String, String), FileReference>,
    >,
}

#[cfg(test)]
impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[async_trait]
impl FileReferenceStore for InMemoryReferenceStore {
    async fn get(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
    ) -> Result<Option<FileReference>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(&(
                app_label.to_string(),
                model_name.to_string(),
                field_name.to_string(),
                pk.to_string(),
            ))
            .cloned())
    }

    async fn upsert(&self, reference: NewFileReference) -> Result<FileReference> {
        let row = FileReference {
            id: Uuid::new_v4(),
            app_label: reference.app_label.clone(),
            model_name: reference.model_name.clone(),
            field_name: reference.field_name.clone(),
            pk: reference.pk.clone(),
            stored_path: reference.stored_path,
            content_type: reference.content_type,
            file_size: reference.file_size,
            created_at: chrono::Utc::now(),
        };
        let mut rows = self.rows.lock().await;
        rows.insert(
            (
                reference.app_label,
                reference.model_name,
                reference.field_name,
                reference.pk,
            ),
            row.clone(),
        );
        Ok(row)
    }

    async fn delete(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
    ) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        Ok(rows
            .remove(&(
                app_label.to_string(),
                model_name.to_string(),
                field_name.to_string(),
                pk.to_string(),
            ))
            .is_some())
    }
}
