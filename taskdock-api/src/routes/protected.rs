/// `GET /protected`: answers only with a valid bearer token
///
/// Mounted behind the auth middleware with the 403 invalid-token policy.

use axum::Json;
use serde::{Deserialize, Serialize};
use taskdock_shared::auth::middleware::AuthContext;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtectedResponse {
    pub message: String,
}

pub async fn protected(auth: AuthContext) -> Json<ProtectedResponse> {
    tracing::info!(user_id = %auth.user_id, email = %auth.email, "protected route accessed");

    Json(ProtectedResponse {
        message: "Access granted".to_string(),
    })
}
