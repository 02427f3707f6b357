pub mod doctors;
pub mod patients;
pub mod queue;
pub mod sessions;

use std::sync::Arc;

use axum::Router;
use chrono::FixedOffset;

use crate::features::doctors::DoctorService;
use crate::features::patients::PatientService;
use crate::features::queue::TicketSequencer;
use crate::features::sessions::{SessionService, TriageService, TriageSettings};
use crate::modules::decision::TriageDecider;
use crate::modules::mailer::Notifier;
use crate::modules::store::TriageStore;
use crate::shared::clock::Clock;

/// Feature services wired over one store, decider, notifier and clock
#[derive(Clone)]
pub struct AppServices {
    pub patients: Arc<PatientService>,
    pub doctors: Arc<DoctorService>,
    pub sequencer: Arc<TicketSequencer>,
    pub sessions: Arc<SessionService>,
    pub triage: Arc<TriageService>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn TriageStore>,
        decider: Arc<dyn TriageDecider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: TriageSettings,
    ) -> Self {
        let offset: FixedOffset = settings.queue_offset;

        let sequencer = Arc::new(TicketSequencer::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            offset,
        ));
        let sessions = Arc::new(SessionService::new(Arc::clone(&store), Arc::clone(&clock)));
        let patients = Arc::new(PatientService::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            Arc::clone(&clock),
            offset,
            settings.notify_timeout,
        ));
        let doctors = Arc::new(DoctorService::new(
            Arc::clone(&store),
            Arc::clone(&sequencer),
        ));
        let triage = Arc::new(TriageService::new(
            store,
            Arc::clone(&sessions),
            Arc::clone(&sequencer),
            decider,
            notifier,
            clock,
            settings,
        ));

        Self {
            patients,
            doctors,
            sequencer,
            sessions,
            triage,
        }
    }

    /// All `/api` routes
    pub fn routes(&self) -> Router {
        Router::new()
            .merge(patients::routes::routes(Arc::clone(&self.patients)))
            .merge(doctors::routes::routes(Arc::clone(&self.doctors)))
            .merge(queue::routes::routes(Arc::clone(&self.sequencer)))
            .merge(sessions::routes::routes(
                Arc::clone(&self.sessions),
                Arc::clone(&self.triage),
            ))
    }
}
