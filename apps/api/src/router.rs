use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use assignment_cell::router::assignment_routes;
use auth_cell::router::auth_routes;
use consultation_cell::router::consultation_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "CareLogix API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/mappings", assignment_routes(state.clone()))
        .nest("/consultations", consultation_routes(state.clone()))
}
