use std::sync::Arc;

use chrono::FixedOffset;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::queue::models::{Ticket, TicketIssue};
use crate::features::sessions::models::NewMessage;
use crate::modules::store::TriageStore;
use crate::shared::clock::{Clock, DayWindow};

/// Snapshot of one doctor's queue for the current local day
#[derive(Debug, Clone)]
pub struct QueueStatus {
    pub doctor_id: Uuid,
    pub day: DayWindow,
    pub current_front: Option<Ticket>,
    pub issued_today: i64,
}

/// Assigns per-doctor, per-day ticket numbers.
///
/// Numbers for one `(doctor, day)` start at 1 and grow by one per ticket. The
/// read-max-then-insert step runs inside the store as a single exclusive
/// unit, so concurrent callers never receive the same number.
pub struct TicketSequencer {
    store: Arc<dyn TriageStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl TicketSequencer {
    pub fn new(store: Arc<dyn TriageStore>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            offset,
        }
    }

    /// The clinic's current local day
    pub fn today(&self) -> DayWindow {
        DayWindow::containing(self.clock.now(), self.offset)
    }

    /// Issue the next number for `(doctor_id, window)` to `session_id`
    /// without closing the session.
    ///
    /// Number-only entry point: triage goes through `queue_session`, which
    /// builds its issue with the same window check and adds the summary and
    /// exchange to the unit.
    #[allow(dead_code)]
    pub async fn issue_ticket(
        &self,
        doctor_id: Uuid,
        session_id: Uuid,
        window: DayWindow,
    ) -> Result<Ticket> {
        let issue = self.ticket_issue(doctor_id, session_id, window)?;
        self.issue(issue).await
    }

    /// Close the session for triage and queue it with `doctor_id` today.
    ///
    /// The summary, the concluding `exchange` and the ticket are written
    /// together or not at all.
    pub async fn queue_session(
        &self,
        session_id: Uuid,
        doctor_id: Uuid,
        triage_summary: &str,
        exchange: Vec<NewMessage>,
    ) -> Result<Ticket> {
        let issue = TicketIssue {
            triage_summary: Some(triage_summary.to_string()),
            messages: exchange,
            ..self.ticket_issue(doctor_id, session_id, self.today())?
        };
        self.issue(issue).await
    }

    fn ticket_issue(
        &self,
        doctor_id: Uuid,
        session_id: Uuid,
        window: DayWindow,
    ) -> Result<TicketIssue> {
        if window.end <= window.start {
            return Err(AppError::Validation(
                "Day window must end after it starts".to_string(),
            ));
        }

        Ok(TicketIssue {
            doctor_id,
            session_id,
            window,
            issued_at: self.clock.now(),
            triage_summary: None,
            messages: Vec::new(),
        })
    }

    async fn issue(&self, issue: TicketIssue) -> Result<Ticket> {
        let ticket = self.store.issue_ticket(issue).await?;

        tracing::info!(
            "Ticket issued: doctor_id={}, session_id={}, number={}",
            ticket.doctor_id,
            ticket.session_id,
            ticket.number
        );

        Ok(ticket)
    }

    /// The ticket being served: lowest number whose session is not diagnosed
    pub async fn current_front(&self, doctor_id: Uuid, window: DayWindow) -> Result<Option<Ticket>> {
        self.store.current_front(doctor_id, window).await
    }

    pub async fn queue_status(&self, doctor_id: Uuid) -> Result<QueueStatus> {
        if self.store.find_doctor(doctor_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Doctor '{}' not found",
                doctor_id
            )));
        }

        let day = self.today();
        let current_front = self.store.current_front(doctor_id, day).await?;
        let issued_today = self.store.count_tickets(doctor_id, Some(day)).await?;

        Ok(QueueStatus {
            doctor_id,
            day,
            current_front,
            issued_today,
        })
    }
}
