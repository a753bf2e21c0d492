#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
pub fn create_authenticated_user() -> AuthenticatedUser {
    AuthenticatedUser {
        account_id: "test-account-id".to_string(),
        sub: "test-sub".to_string(),
        roles: vec![],
    }
}

#[cfg(test)]
pub fn create_user_with_role(role: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        account_id: "test-account-id".to_string(),
        sub: "test-sub".to_string(),
        roles: vec![role.to_string()],
    }
}

#[cfg(test)]
async fn inject_authenticated_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_authenticated_user());
    next.run(request).await
}

/// Wrap a router so every request carries an authenticated test user.
#[cfg(test)]
pub fn with_authenticated_user(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(
        inject_authenticated_user_middleware,
    ))
}
