/// Authentication endpoints
///
/// - `POST /register` - create an account
/// - `POST /login` - exchange credentials for a bearer token
///
/// Request bodies are checked with `validator` before the service runs.
/// Malformed registration bodies are 422; malformed login bodies are 400.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskdock_shared::models::user::UserProfile;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Register a new user
///
/// ```text
/// POST /register
/// {"name": "Ana", "email": "ana@example.com", "password": "secret123"}
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    let user = state
        .auth
        .register(&req.name, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user: user.profile(),
        }),
    ))
}

/// Log in
///
/// ```text
/// POST /login
/// {"email": "ana@example.com", "password": "secret123"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: malformed email or missing password
/// - `404 Not Found`: no account with this email
/// - `401 Unauthorized`: wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()
        .map_err(|e| ApiError::InvalidInput(validation_details(&e)))?;

    let token = state.auth.login(&req.email, &req.password).await?;

    Ok(Json(LoginResponse { token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            name: "An".to_string(),
            email: "nope".to_string(),
            password: "12345".to_string(),
        };
        let details = validation_details(&bad.validate().unwrap_err());
        let fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "name", "password"]);
    }

    #[test]
    fn test_login_request_requires_password() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"ana@example.com"}"#).unwrap();
        let details = validation_details(&req.validate().unwrap_err());
        assert_eq!(details[0].field, "password");
        assert_eq!(details[0].message, "Password is required");
    }
}
