use std::sync::Arc;

use axum::{routing::post, Router};

use crate::features::patients::handlers;
use crate::features::patients::services::PatientService;

pub fn routes(service: Arc<PatientService>) -> Router {
    Router::new()
        .route("/api/patients/register", post(handlers::register_patient))
        .route("/api/patients/verify-otp", post(handlers::verify_otp))
        .with_state(service)
}
