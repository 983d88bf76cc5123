/// Bearer-token authentication middleware for Axum
///
/// Extracts `Authorization: Bearer <jwt>`, verifies it through
/// [`AuthService::verify_token`] and stores an [`AuthContext`] in the request
/// extensions for handlers to extract.
///
/// Missing credentials always yield 401. What an invalid or expired token
/// yields depends on the [`InvalidTokenPolicy`] of the mounting router: the
/// task routes answer 401, the `/protected` probe answers 403.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use taskdock_shared::auth::middleware::{jwt_auth_middleware, AuthContext, InvalidTokenPolicy};
/// use taskdock_shared::services::auth::AuthService;
///
/// async fn handler(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.email)
/// }
///
/// fn router(auth: AuthService) -> Router {
///     Router::new()
///         .route("/me", get(handler))
///         .layer(middleware::from_fn(move |req, next| {
///             jwt_auth_middleware(auth.clone(), InvalidTokenPolicy::Unauthorized, req, next)
///         }))
/// }
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::Claims;
use crate::services::auth::AuthService;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

/// Status returned when a token is present but fails verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTokenPolicy {
    Unauthorized,
    Forbidden,
}

/// Error type for authentication middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or no bearer token in it
    MissingCredentials,

    /// Token rejected; carries the status the router asked for
    InvalidToken(InvalidTokenPolicy),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Access token not provided",
            ),
            AuthError::InvalidToken(InvalidTokenPolicy::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid or expired token",
            ),
            AuthError::InvalidToken(InvalidTokenPolicy::Forbidden) => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Invalid or expired token",
            ),
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// Pulls the bearer token out of the `Authorization` header
///
/// The scheme is matched case-insensitively; an empty token counts as missing.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MissingCredentials)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// JWT authentication middleware
///
/// On success the request continues with an [`AuthContext`] extension.
pub async fn jwt_auth_middleware(
    auth: AuthService,
    policy: InvalidTokenPolicy,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;

    let claims = auth.verify_token(token).ok_or_else(|| {
        tracing::debug!(path = %req.uri().path(), "rejected bearer token");
        AuthError::InvalidToken(policy)
    })?;

    req.extensions_mut().insert(AuthContext::from(claims));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Ok("abc"));
    }

    #[test]
    fn test_bearer_token_missing() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingCredentials));
        assert_eq!(bearer_token(&headers("Bearer")), Err(AuthError::MissingCredentials));
        assert_eq!(bearer_token(&headers("Bearer   ")), Err(AuthError::MissingCredentials));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), Err(AuthError::MissingCredentials));
    }

    #[test]
    fn test_invalid_token_status_follows_policy() {
        let unauthorized = AuthError::InvalidToken(InvalidTokenPolicy::Unauthorized).into_response();
        let forbidden = AuthError::InvalidToken(InvalidTokenPolicy::Forbidden).into_response();

        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
