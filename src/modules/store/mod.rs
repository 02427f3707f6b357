//! Persistence collaborator for patients, sessions, messages, doctors and tickets.
//!
//! Components receive an `Arc<dyn TriageStore>` from the bootstrap; the
//! Postgres implementation backs production and an in-memory one backs tests.

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryTriageStore;
pub use postgres::PgTriageStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::doctors::models::Doctor;
use crate::features::patients::models::{Patient, PatientRegistration};
use crate::features::queue::models::{Ticket, TicketIssue};
use crate::features::sessions::models::{Message, NewMessage, Session, SessionDetail, Vitals};
use crate::shared::clock::DayWindow;

#[async_trait]
pub trait TriageStore: Send + Sync {
    /// Create the patient, or overwrite demographics and code for a known email
    async fn upsert_patient(
        &self,
        registration: PatientRegistration,
        at: DateTime<Utc>,
    ) -> Result<Patient>;

    /// Atomically consume the patient's code and open a new session.
    ///
    /// `NotFound` for an unknown email, `Unauthorized` when the code does not
    /// match or was already used.
    async fn open_session_with_otp(
        &self,
        email: &str,
        otp: &str,
        vitals: Vitals,
        at: DateTime<Utc>,
    ) -> Result<Session>;

    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>>;

    /// All doctors, ordered by name
    async fn list_doctors(&self) -> Result<Vec<Doctor>>;

    /// Session with its patient and messages ascending by creation time
    async fn find_session(&self, id: Uuid) -> Result<Option<SessionDetail>>;

    /// Other sessions of the patient that concluded triage, most recent first
    async fn find_prior_sessions(
        &self,
        patient_id: Uuid,
        exclude_session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Session>>;

    /// Append the patient message and its reply; both or neither.
    ///
    /// Runs under the session's lock: `Conflict` once triage concluded, and
    /// both messages are stamped after the newest one already stored.
    async fn append_exchange(
        &self,
        session_id: Uuid,
        patient: NewMessage,
        reply: NewMessage,
    ) -> Result<(Message, Message)>;

    /// Set the diagnosis. `None` when the session does not exist.
    async fn record_diagnosis(
        &self,
        session_id: Uuid,
        diagnosis: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Session>>;

    /// Issue `max + 1` for `(doctor, window)` as one exclusive unit. When a
    /// summary is given, the same unit closes the session for triage and
    /// appends the carried messages after the newest stored one. `NotFound`
    /// when the session or doctor does not exist.
    async fn issue_ticket(&self, issue: TicketIssue) -> Result<Ticket>;

    /// Lowest-numbered ticket of the day whose session has no diagnosis
    async fn current_front(&self, doctor_id: Uuid, window: DayWindow) -> Result<Option<Ticket>>;

    /// Tickets issued for the doctor, within `window` or all-time
    async fn count_tickets(&self, doctor_id: Uuid, window: Option<DayWindow>) -> Result<i64>;
}
