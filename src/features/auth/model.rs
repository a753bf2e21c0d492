use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub account_id: String,
    pub sub: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    /// Check if user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// The calling context a field condition is evaluated against.
///
/// Carries the authenticated principal when the request presented a valid
/// bearer token; `None` means the caller is anonymous.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    pub user: Option<AuthenticatedUser>,
}

impl AccessContext {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn for_user(user: AuthenticatedUser) -> Self {
        Self { user: Some(user) }
    }

    /// True when a real, non-anonymous principal made the request.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
