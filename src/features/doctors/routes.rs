use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::doctors::handlers;
use crate::features::doctors::services::DoctorService;

pub fn routes(service: Arc<DoctorService>) -> Router {
    Router::new()
        .route("/api/doctors", get(handlers::list_doctors))
        .route("/api/doctors/{id}", get(handlers::get_doctor))
        .with_state(service)
}
