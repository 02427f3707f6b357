//! In-memory store for unit tests.
//!
//! Issuance for one doctor-day is serialized with an async lock, mirroring
//! the advisory lock of the Postgres store. Every other operation takes the
//! data lock only for the duration of a synchronous block.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::TriageStore;
use crate::core::error::{AppError, Result};
use crate::features::doctors::models::Doctor;
use crate::features::patients::models::{Patient, PatientRegistration};
use crate::features::queue::models::{next_ticket_number, Ticket, TicketIssue};
use crate::features::sessions::models::{
    stamp_after, Message, NewMessage, Session, SessionDetail, Vitals,
};
use crate::shared::clock::DayWindow;

#[derive(Default)]
struct Data {
    patients: HashMap<Uuid, Patient>,
    doctors: HashMap<Uuid, Doctor>,
    sessions: HashMap<Uuid, Session>,
    messages: Vec<Message>,
    tickets: Vec<Ticket>,
}

type DoctorDayKey = (Uuid, DateTime<Utc>);

#[derive(Default)]
pub struct MemoryTriageStore {
    data: Mutex<Data>,
    day_locks: Mutex<HashMap<DoctorDayKey, Arc<tokio::sync::Mutex<()>>>>,
    fail_ticket_writes: AtomicBool,
    fail_message_writes: AtomicBool,
}

fn injected_failure() -> AppError {
    AppError::Database(sqlx::Error::Protocol("injected write failure".to_string()))
}

impl MemoryTriageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn day_lock(&self, doctor_id: Uuid, window: DayWindow) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.day_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry((doctor_id, window.start)).or_default().clone()
    }

    /// Make the next ticket writes fail like a lost database connection
    pub fn fail_ticket_writes(&self, fail: bool) {
        self.fail_ticket_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_message_writes(&self, fail: bool) {
        self.fail_message_writes.store(fail, Ordering::SeqCst);
    }

    pub fn seed_doctor(&self, name: &str, specialty: &str, room: &str) -> Doctor {
        let doctor = Doctor {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: format!("{}@clinic.test", name.to_lowercase().replace(' ', ".")),
            specialty: specialty.to_string(),
            room: room.to_string(),
        };
        self.data().doctors.insert(doctor.id, doctor.clone());
        doctor
    }

    pub fn seed_patient(&self, name: &str, email: &str, date_of_birth: NaiveDate) -> Patient {
        let now = Utc::now();
        let patient = Patient {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: email.to_string(),
            nationality: "Indonesia".to_string(),
            date_of_birth,
            gender: "female".to_string(),
            otp: None,
            created_at: now,
            updated_at: now,
        };
        self.data().patients.insert(patient.id, patient.clone());
        patient
    }

    pub fn seed_session(&self, patient_id: Uuid, created_at: DateTime<Utc>) -> Session {
        let session = Session {
            id: Uuid::now_v7(),
            patient_id,
            weight: 62.5,
            height: 165.0,
            heart_rate: 78.0,
            body_temperature: 36.9,
            triage_summary: None,
            doctor_diagnosis: None,
            created_at,
            updated_at: created_at,
        };
        self.data().sessions.insert(session.id, session.clone());
        session
    }

    pub fn session(&self, id: Uuid) -> Option<Session> {
        self.data().sessions.get(&id).cloned()
    }

    pub fn patient_by_email(&self, email: &str) -> Option<Patient> {
        self.data()
            .patients
            .values()
            .find(|p| p.email == email)
            .cloned()
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.data().tickets.clone()
    }

    pub fn messages(&self, session_id: Uuid) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .data()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }
}

fn stored_message(session_id: Uuid, message: NewMessage) -> Message {
    Message {
        id: Uuid::now_v7(),
        session_id,
        role: message.role,
        content: message.content,
        created_at: message.created_at,
    }
}

impl Data {
    /// Append after the newest stored message of the session
    fn append_in_order(&mut self, session_id: Uuid, messages: Vec<NewMessage>) -> Vec<Message> {
        let last = self
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .map(|m| m.created_at)
            .max();

        let stored: Vec<Message> = stamp_after(last, messages)
            .into_iter()
            .map(|message| stored_message(session_id, message))
            .collect();
        self.messages.extend(stored.iter().cloned());
        stored
    }
}

fn ensure_open(session: Option<&Session>, session_id: Uuid) -> Result<()> {
    let session =
        session.ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", session_id)))?;

    if session.has_triage_summary() || session.has_diagnosis() {
        return Err(AppError::Conflict(format!(
            "Session '{}' was already queued",
            session_id
        )));
    }

    Ok(())
}

#[async_trait]
impl TriageStore for MemoryTriageStore {
    async fn upsert_patient(
        &self,
        registration: PatientRegistration,
        at: DateTime<Utc>,
    ) -> Result<Patient> {
        let mut data = self.data();

        if let Some(existing) = data
            .patients
            .values_mut()
            .find(|p| p.email == registration.email)
        {
            existing.name = registration.name;
            existing.nationality = registration.nationality;
            existing.date_of_birth = registration.date_of_birth;
            existing.gender = registration.gender;
            existing.otp = Some(registration.otp);
            existing.updated_at = at;
            return Ok(existing.clone());
        }

        let patient = Patient {
            id: Uuid::now_v7(),
            name: registration.name,
            email: registration.email,
            nationality: registration.nationality,
            date_of_birth: registration.date_of_birth,
            gender: registration.gender,
            otp: Some(registration.otp),
            created_at: at,
            updated_at: at,
        };
        data.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn open_session_with_otp(
        &self,
        email: &str,
        otp: &str,
        vitals: Vitals,
        at: DateTime<Utc>,
    ) -> Result<Session> {
        let mut data = self.data();

        let patient = data
            .patients
            .values_mut()
            .find(|p| p.email == email)
            .ok_or_else(|| AppError::NotFound(format!("Patient '{}' not found", email)))?;

        if patient.otp.as_deref() != Some(otp) {
            return Err(AppError::Unauthorized("Invalid or expired OTP".to_string()));
        }
        patient.otp = None;
        patient.updated_at = at;
        let patient_id = patient.id;

        let session = Session {
            id: Uuid::now_v7(),
            patient_id,
            weight: vitals.weight,
            height: vitals.height,
            heart_rate: vitals.heart_rate,
            body_temperature: vitals.body_temperature,
            triage_summary: None,
            doctor_diagnosis: None,
            created_at: at,
            updated_at: at,
        };
        data.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.data().doctors.get(&id).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = self.data().doctors.values().cloned().collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionDetail>> {
        let (session, patient) = {
            let data = self.data();
            let Some(session) = data.sessions.get(&id).cloned() else {
                return Ok(None);
            };
            let patient = data.patients.get(&session.patient_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("Session '{}' has no owner", session.id))
            })?;
            (session, patient)
        };

        Ok(Some(SessionDetail {
            session,
            patient,
            messages: self.messages(id),
        }))
    }

    async fn find_prior_sessions(
        &self,
        patient_id: Uuid,
        exclude_session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .data()
            .sessions
            .values()
            .filter(|s| s.patient_id == patient_id && s.id != exclude_session_id)
            .filter(|s| s.has_triage_summary())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(sessions)
    }

    async fn append_exchange(
        &self,
        session_id: Uuid,
        patient: NewMessage,
        reply: NewMessage,
    ) -> Result<(Message, Message)> {
        if self.fail_message_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut data = self.data();
        ensure_open(data.sessions.get(&session_id), session_id)?;

        let mut stored = data.append_in_order(session_id, vec![patient, reply]);
        let reply = stored.pop();
        let patient = stored.pop();
        match (patient, reply) {
            (Some(patient), Some(reply)) => Ok((patient, reply)),
            _ => Err(AppError::Internal("Exchange was not stored".to_string())),
        }
    }

    async fn record_diagnosis(
        &self,
        session_id: Uuid,
        diagnosis: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let mut data = self.data();
        Ok(data.sessions.get_mut(&session_id).map(|session| {
            session.doctor_diagnosis = Some(diagnosis.to_string());
            session.updated_at = at;
            session.clone()
        }))
    }

    async fn issue_ticket(&self, issue: TicketIssue) -> Result<Ticket> {
        let lock = self.day_lock(issue.doctor_id, issue.window);
        let _guard = lock.lock().await;

        let current_max = {
            let data = self.data();
            if issue.triage_summary.is_some() {
                ensure_open(data.sessions.get(&issue.session_id), issue.session_id)?;
            }
            data.tickets
                .iter()
                .filter(|t| t.doctor_id == issue.doctor_id && issue.window.contains(t.day_start))
                .map(|t| t.number)
                .max()
        };

        // Give concurrent issuers a chance to interleave between read and write
        tokio::task::yield_now().await;

        if self.fail_ticket_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut data = self.data();
        if !data.sessions.contains_key(&issue.session_id)
            || !data.doctors.contains_key(&issue.doctor_id)
        {
            return Err(AppError::NotFound("Session or doctor not found".to_string()));
        }
        let number = next_ticket_number(current_max);

        let duplicate = data.tickets.iter().any(|t| {
            t.session_id == issue.session_id
                || (t.doctor_id == issue.doctor_id
                    && t.day_start == issue.window.start
                    && t.number == number)
        });
        if duplicate {
            return Err(AppError::Conflict("Ticket already issued".to_string()));
        }

        if let Some(summary) = issue.triage_summary {
            ensure_open(data.sessions.get(&issue.session_id), issue.session_id)?;
            if let Some(session) = data.sessions.get_mut(&issue.session_id) {
                session.triage_summary = Some(summary);
                session.updated_at = issue.issued_at;
            }
        }

        let ticket = Ticket {
            id: Uuid::now_v7(),
            doctor_id: issue.doctor_id,
            session_id: issue.session_id,
            number,
            day_start: issue.window.start,
            created_at: issue.issued_at,
        };
        data.tickets.push(ticket.clone());
        data.append_in_order(issue.session_id, issue.messages);
        Ok(ticket)
    }

    async fn current_front(&self, doctor_id: Uuid, window: DayWindow) -> Result<Option<Ticket>> {
        let data = self.data();
        Ok(data
            .tickets
            .iter()
            .filter(|t| t.doctor_id == doctor_id && window.contains(t.day_start))
            .filter(|t| {
                data.sessions
                    .get(&t.session_id)
                    .is_some_and(|s| !s.has_diagnosis())
            })
            .min_by_key(|t| t.number)
            .cloned())
    }

    async fn count_tickets(&self, doctor_id: Uuid, window: Option<DayWindow>) -> Result<i64> {
        let data = self.data();
        let count = data
            .tickets
            .iter()
            .filter(|t| t.doctor_id == doctor_id)
            .filter(|t| window.map_or(true, |w| w.contains(t.day_start)))
            .count();
        Ok(count as i64)
    }
}
