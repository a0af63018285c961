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

use crate::models::CreateAssignmentRequest;
use crate::services::AssignmentService;

#[axum::debug_handler]
pub async fn assign_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AssignmentService::new(&config);

    let assignment = service.assign_doctor(request, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Doctor assigned to patient successfully",
            "assignment": assignment
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_assignments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = AssignmentService::new(&config);

    let assignments = service.list_assignments(user.id).await?;

    Ok(Json(json!(assignments)))
}

#[axum::debug_handler]
pub async fn get_doctors_for_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AssignmentService::new(&config);

    let doctors = service.doctors_for_patient(patient_id, user.id).await?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn remove_assignment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AssignmentService::new(&config);

    service.remove_assignment(assignment_id, user.id).await?;

    Ok(Json(json!({
        "message": "Doctor removed from patient successfully"
    })))
}
