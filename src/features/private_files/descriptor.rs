use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::features::auth::model::AccessContext;
use crate::features::private_files::models::FileReference;
use crate::shared::validation::COMPONENT_REGEX;

/// Authorization predicate for a gated file field.
///
/// Any function value matching this signature is a valid condition; the
/// serving view calls it on every request, the resolver never does.
pub type Condition =
    Arc<dyn Fn(AccessContext, FileReference) -> BoxFuture<'static, bool> + Send + Sync>;

/// Default condition: the caller is an authenticated, non-anonymous principal.
pub fn caller_is_authenticated() -> Condition {
    Arc::new(|ctx, _file| Box::pin(async move { ctx.is_authenticated() }))
}

/// Condition requiring a specific role on the authenticated principal.
pub fn require_role(role: &str) -> Condition {
    let role = role.to_string();
    Arc::new(move |ctx, _file| {
        let ok = ctx
            .user
            .as_ref()
            .map(|u| u.has_role(&role))
            .unwrap_or(false);
        Box::pin(async move { ok })
    })
}

/// Per-field serving policy, declared once at startup and immutable after.
#[derive(Clone)]
pub struct FieldDescriptor {
    condition: Condition,
    attachment: bool,
    single_use: bool,
    upload_to: String,
}

impl FieldDescriptor {
    /// A descriptor with the default policy: authenticated callers only,
    /// download disposition, reusable URLs. `upload_to` is the storage path
    /// prefix for files uploaded against this field.
    pub fn new(upload_to: &str) -> Self {
        Self {
            condition: caller_is_authenticated(),
            attachment: true,
            single_use: false,
            upload_to: upload_to.trim_matches('/').to_string(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// `false` serves the file inline instead of as a download.
    pub fn with_attachment(mut self, attachment: bool) -> Self {
        self.attachment = attachment;
        self
    }

    /// When set, every resolved gated URL carries a freshly minted
    /// single-use access key.
    pub fn with_single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    pub fn condition(&self) -> Condition {
        Arc::clone(&self.condition)
    }

    pub fn attachment(&self) -> bool {
        self.attachment
    }

    pub fn single_use(&self) -> bool {
        self.single_use
    }

    pub fn upload_to(&self) -> &str {
        &self.upload_to
    }

    /// Evaluate the configured condition for one request.
    pub async fn evaluate(&self, ctx: &AccessContext, file: &FileReference) -> bool {
        (self.condition)(ctx.clone(), file.clone()).await
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("attachment", &self.attachment)
            .field("single_use", &self.single_use)
            .field("upload_to", &self.upload_to)
            .finish_non_exhaustive()
    }
}

/// All gated file fields known to the application, keyed by
/// (app label, lowercase model name, field name).
///
/// Populated at startup, then shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: HashMap<(String, String, String), Arc<FieldDescriptor>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field. Names must be lowercase identifiers; registration
    /// happens once at startup, so malformed names are a programming error.
    pub fn register(
        &mut self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
        descriptor: FieldDescriptor,
    ) -> &mut Self {
        let model_name = model_name.to_lowercase();
        for name in [app_label, model_name.as_str(), field_name] {
            assert!(
                COMPONENT_REGEX.is_match(name),
                "invalid field registration component: '{}'",
                name
            );
        }
        self.fields.insert(
            (
                app_label.to_string(),
                model_name,
                field_name.to_string(),
            ),
            Arc::new(descriptor),
        );
        self
    }

    pub fn get(
        &self,
        app_label: &str,
        model_name: &str,
        field_name: &str,
    ) -> Option<Arc<FieldDescriptor>> {
        self.fields
            .get(&(
                app_label.to_string(),
                model_name.to_lowercase(),
                field_name.to_string(),
            ))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::AccessContext;
    use crate::features::private_files::models::FileReference;
    use crate::shared::test_helpers::{create_authenticated_user, create_user_with_role};

    fn file() -> FileReference {
        FileReference::test_fixture("documents", "report", "scan", "1", "reports/1/scan.pdf")
    }

    #[test]
    fn test_defaults() {
        let descriptor = FieldDescriptor::new("reports");
        assert!(descriptor.attachment());
        assert!(!descriptor.single_use());
        assert_eq!(descriptor.upload_to(), "reports");
    }

    #[test]
    fn test_upload_to_is_trimmed() {
        let descriptor = FieldDescriptor::new("/reports/");
        assert_eq!(descriptor.upload_to(), "reports");
    }

    #[tokio::test]
    async fn test_default_condition_requires_principal() {
        let descriptor = FieldDescriptor::new("reports");

        let anonymous = AccessContext::anonymous();
        assert!(!descriptor.evaluate(&anonymous, &file()).await);

        let authenticated = AccessContext::for_user(create_authenticated_user());
        assert!(descriptor.evaluate(&authenticated, &file()).await);
    }

    #[tokio::test]
    async fn test_require_role_condition() {
        let descriptor = FieldDescriptor::new("invoices").with_condition(require_role("billing"));

        let plain = AccessContext::for_user(create_authenticated_user());
        assert!(!descriptor.evaluate(&plain, &file()).await);

        let billing = AccessContext::for_user(create_user_with_role("billing"));
        assert!(descriptor.evaluate(&billing, &file()).await);
    }

    #[test]
    fn test_registry_lookup_lowercases_model_name() {
        let mut registry = FieldRegistry::new();
        registry.register("documents", "Report", "scan", FieldDescriptor::new("reports"));

        assert!(registry.get("documents", "report", "scan").is_some());
        assert!(registry.get("documents", "REPORT", "scan").is_some());
        assert!(registry.get("documents", "report", "other").is_none());
        assert_eq!(registry.len(), 1);
    }
}
