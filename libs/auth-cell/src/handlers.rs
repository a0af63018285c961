use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let service = AuthService::new(&config);

    let response = service.register(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let service = AuthService::new(&config);

    let response = service.login(request).await?;

    Ok(Json(response))
}
