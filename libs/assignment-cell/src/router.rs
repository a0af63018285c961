use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn assignment_routes(state: Arc<AppConfig>) -> Router {
    // "/{id}" is a patient id for GET and an assignment id for DELETE.
    Router::new()
        .route("/", post(handlers::assign_doctor))
        .route("/", get(handlers::list_assignments))
        .route(
            "/{id}",
            get(handlers::get_doctors_for_patient).delete(handlers::remove_assignment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
