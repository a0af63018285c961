use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Middleware for authentication. Verifies the bearer token and confirms the
/// referenced user still exists before attaching the identity to the request.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let user = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    // A valid signature is not enough: the account may have been removed
    // since the token was issued.
    let store = PostgrestClient::new(&config);
    let path = format!("/rest/v1/users?id=eq.{}&select=id", user.id);
    let rows: Vec<Value> = store.select(&path).await?;
    if rows.is_empty() {
        return Err(AppError::Auth("User not found".to_string()));
    }

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
