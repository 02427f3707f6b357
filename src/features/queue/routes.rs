use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::queue::handlers;
use crate::features::queue::services::TicketSequencer;

pub fn routes(sequencer: Arc<TicketSequencer>) -> Router {
    Router::new()
        .route("/api/queue/{doctor_id}", get(handlers::get_queue_status))
        .with_state(sequencer)
}
