use std::sync::Arc;

use axum::{routing::get, routing::post, Router};

use crate::features::sessions::handlers::{self, SessionRoutesState};
use crate::features::sessions::services::{SessionService, TriageService};

pub fn routes(sessions: Arc<SessionService>, triage: Arc<TriageService>) -> Router {
    let state = SessionRoutesState { sessions, triage };

    Router::new()
        .route(
            "/api/sessions/{id}",
            get(handlers::get_session).post(handlers::send_message),
        )
        .route("/api/sessions/{id}/diagnose", post(handlers::diagnose_session))
        .with_state(state)
}
