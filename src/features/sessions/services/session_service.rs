use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::sessions::models::{Session, SessionDetail};
use crate::modules::store::TriageStore;
use crate::shared::clock::Clock;

/// Session lifecycle queries and the staff-side diagnosis transition
pub struct SessionService {
    store: Arc<dyn TriageStore>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(store: Arc<dyn TriageStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Load a session that still accepts patient messages.
    ///
    /// A session that already left triage is reported as completed, not as
    /// missing.
    pub async fn get_active(&self, id: Uuid) -> Result<SessionDetail> {
        let detail = self
            .store
            .find_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", id)))?;

        if !detail.state().accepts_messages() {
            return Err(AppError::SessionCompleted(id));
        }

        Ok(detail)
    }

    /// Set (or overwrite) the doctor's diagnosis. Allowed from any state.
    pub async fn record_doctor_diagnosis(&self, id: Uuid, diagnosis: &str) -> Result<Session> {
        let session = self
            .store
            .record_diagnosis(id, diagnosis.trim(), self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", id)))?;

        tracing::info!("Diagnosis recorded for session {}", id);

        Ok(session)
    }
}
