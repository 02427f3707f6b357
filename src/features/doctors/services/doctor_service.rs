use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::doctors::models::Doctor;
use crate::features::queue::models::Ticket;
use crate::features::queue::services::TicketSequencer;
use crate::modules::store::TriageStore;

/// A doctor with today's queue figures
#[derive(Debug, Clone)]
pub struct DoctorDetails {
    pub doctor: Doctor,
    pub appointment_count_all_time: i64,
    pub appointment_count_daily: i64,
    pub current_queue: Option<Ticket>,
}

/// Service for the doctor directory
pub struct DoctorService {
    store: Arc<dyn TriageStore>,
    sequencer: Arc<TicketSequencer>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn TriageStore>, sequencer: Arc<TicketSequencer>) -> Self {
        Self { store, sequencer }
    }

    pub async fn list(&self) -> Result<Vec<Doctor>> {
        self.store.list_doctors().await
    }

    pub async fn details(&self, id: Uuid) -> Result<DoctorDetails> {
        let doctor = self
            .store
            .find_doctor(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Doctor '{}' not found", id)))?;

        let today = self.sequencer.today();
        let appointment_count_all_time = self.store.count_tickets(id, None).await?;
        let appointment_count_daily = self.store.count_tickets(id, Some(today)).await?;
        let current_queue = self.sequencer.current_front(id, today).await?;

        Ok(DoctorDetails {
            doctor,
            appointment_count_all_time,
            appointment_count_daily,
            current_queue,
        })
    }
}
