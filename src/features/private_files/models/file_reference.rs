use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a stored file bound to one record field.
///
/// The owning record is identified by (app_label, model_name, field_name, pk);
/// `stored_path` is the key under the active storage backend.
#[derive(Debug, Clone, FromRow)]
pub struct FileReference {
    pub id: Uuid,
    pub app_label: String,
    pub model_name: String,
    pub field_name: String,
    pub pk: String,
    pub stored_path: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

impl FileReference {
    /// The filename is the basename of the stored path.
    pub fn filename(&self) -> &str {
        self.stored_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.stored_path)
    }

    /// The string stored as a single-use token's value:
    /// `<app>-<model>-<field>-<pk>-<filename>`.
    pub fn token_descriptor(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.app_label,
            self.model_name,
            self.field_name,
            self.pk,
            self.filename()
        )
    }

    #[cfg(test)]
    pub fn test_fixture(
        app_label: &str,
        model_name: &str,
        field_name: &str,
        pk: &str,
        stored_path: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            app_label: app_label.to_string(),
            model_name: model_name.to_string(),
            field_name: field_name.to_string(),
            pk: pk.to_string(),
            stored_path: stored_path.to_string(),
            content_type: "application/octet-stream".to_string(),
            file_size: 0,
            created_at: Utc::now(),
        }
    }
}

/// Insert/update payload for a file reference.
#[derive(Debug, Clone)]
pub struct NewFileReference {
    pub app_label: String,
    pub model_name: String,
    pub field_name: String,
    pub pk: String,
    pub stored_path: String,
    pub content_type: String,
    pub file_size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_is_basename() {
        let file =
            FileReference::test_fixture("documents", "report", "scan", "42", "reports/42/a.pdf");
        assert_eq!(file.filename(), "a.pdf");

        let flat = FileReference::test_fixture("documents", "report", "scan", "42", "a.pdf");
        assert_eq!(flat.filename(), "a.pdf");
    }

    #[test]
    fn test_token_descriptor_round_trips_identity() {
        let file =
            FileReference::test_fixture("documents", "report", "scan", "42", "reports/42/a.pdf");
        assert_eq!(file.token_descriptor(), "documents-report-scan-42-a.pdf");
    }
}
