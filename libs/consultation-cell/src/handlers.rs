use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::BookConsultationRequest;
use crate::services::BookingService;

#[axum::debug_handler]
pub async fn book_consultation(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookConsultationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BookingService::new(&config);

    let consultation = service.book_consultation(request, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Consultation booked successfully",
            "consultation": consultation
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_consultations(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&config);

    let consultations = service.list_consultations(user.id).await?;

    Ok(Json(json!(consultations)))
}

#[axum::debug_handler]
pub async fn cancel_consultation(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(consultation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&config);

    let consultation = service.cancel_consultation(consultation_id, user.id).await?;

    Ok(Json(json!({
        "message": "Consultation cancelled successfully",
        "consultation": consultation
    })))
}
