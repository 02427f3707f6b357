use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::TriageStore;
use crate::core::error::{map_write_error, AppError, Result};
use crate::features::doctors::models::Doctor;
use crate::features::patients::models::{Patient, PatientRegistration};
use crate::features::queue::models::{next_ticket_number, Ticket, TicketIssue};
use crate::features::sessions::models::{
    stamp_after, Message, NewMessage, Session, SessionDetail, Vitals,
};
use crate::shared::clock::DayWindow;

const PATIENT_COLUMNS: &str =
    "id, name, email, nationality, date_of_birth, gender, otp, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, patient_id, weight, height, heart_rate, body_temperature, \
     triage_summary, doctor_diagnosis, created_at, updated_at";

const TICKET_COLUMNS: &str = "id, doctor_id, session_id, number, day_start, created_at";

/// Postgres-backed store
pub struct PgTriageStore {
    pool: PgPool,
}

impl PgTriageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serializes issuance for one doctor-day across every process sharing
    /// the database. Released on commit or rollback.
    async fn lock_doctor_day(
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
        window: DayWindow,
    ) -> Result<()> {
        let key = format!("ticket:{}:{}", doctor_id, window.start.timestamp());

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to acquire ticket lock: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(())
    }

    async fn find_max_ticket_number(
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
        window: DayWindow,
    ) -> Result<Option<i32>> {
        let max: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT MAX(number) FROM tickets
            WHERE doctor_id = $1 AND day_start >= $2 AND day_start < $3
            "#,
        )
        .bind(doctor_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read max ticket number: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(max)
    }

    /// Locks the session row and rejects it if triage already concluded.
    /// Every write that appends to a session goes through here first.
    async fn lock_open_session(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
    ) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE id = $1 FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to lock session: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", session_id)))?;

        if session.has_triage_summary() || session.has_diagnosis() {
            return Err(AppError::Conflict(format!(
                "Session '{}' was already queued",
                session_id
            )));
        }

        Ok(session)
    }

    async fn set_triage_summary(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
        summary: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE sessions SET triage_summary = $2, updated_at = $3 WHERE id = $1")
            .bind(session_id)
            .bind(summary)
            .bind(at)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to set triage summary: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(())
    }

    async fn last_message_at(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>> {
        sqlx::query_scalar("SELECT MAX(created_at) FROM messages WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read newest message time: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Append `messages` after the newest stored one. The caller must hold
    /// the session row lock.
    async fn append_in_order(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<Message>> {
        let last = Self::last_message_at(tx, session_id).await?;

        let mut stored = Vec::with_capacity(messages.len());
        for message in stamp_after(last, messages) {
            stored.push(Self::insert_message(tx, session_id, message).await?);
        }

        Ok(stored)
    }

    async fn insert_message(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
        message: NewMessage,
    ) -> Result<Message> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, session_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, session_id, role, content, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(session_id)
        .bind(message.role)
        .bind(message.content)
        .bind(message.created_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert message: {:?}", e);
            AppError::Database(e)
        })
    }
}

#[async_trait]
impl TriageStore for PgTriageStore {
    async fn upsert_patient(
        &self,
        registration: PatientRegistration,
        at: DateTime<Utc>,
    ) -> Result<Patient> {
        sqlx::query_as::<_, Patient>(&format!(
            r#"
            INSERT INTO patients (
                id, name, email, nationality, date_of_birth, gender, otp, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                nationality = EXCLUDED.nationality,
                date_of_birth = EXCLUDED.date_of_birth,
                gender = EXCLUDED.gender,
                otp = EXCLUDED.otp,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            PATIENT_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&registration.name)
        .bind(&registration.email)
        .bind(&registration.nationality)
        .bind(registration.date_of_birth)
        .bind(&registration.gender)
        .bind(&registration.otp)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert patient: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn open_session_with_otp(
        &self,
        email: &str,
        otp: &str,
        vitals: Vitals,
        at: DateTime<Utc>,
    ) -> Result<Session> {
        let mut tx = self.pool.begin().await?;

        let patient = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {} FROM patients WHERE email = $1 FOR UPDATE",
            PATIENT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load patient by email: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound(format!("Patient '{}' not found", email)))?;

        if patient.otp.as_deref() != Some(otp) {
            return Err(AppError::Unauthorized("Invalid or expired OTP".to_string()));
        }

        sqlx::query("UPDATE patients SET otp = NULL, updated_at = $2 WHERE id = $1")
            .bind(patient.id)
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to clear OTP: {:?}", e);
                AppError::Database(e)
            })?;

        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (
                id, patient_id, weight, height, heart_rate, body_temperature, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(patient.id)
        .bind(vitals.weight)
        .bind(vitals.height)
        .bind(vitals.heart_rate)
        .bind(vitals.body_temperature)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create session: {:?}", e);
            AppError::Database(e)
        })?;

        tx.commit().await?;

        Ok(session)
    }

    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        sqlx::query_as::<_, Doctor>(
            "SELECT id, name, email, specialty, room FROM doctors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get doctor by ID: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        sqlx::query_as::<_, Doctor>(
            "SELECT id, name, email, specialty, room FROM doctors ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list doctors: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionDetail>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get session by ID: {:?}", e);
            AppError::Database(e)
        })?;

        let Some(session) = session else {
            return Ok(None);
        };

        let patient = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {} FROM patients WHERE id = $1",
            PATIENT_COLUMNS
        ))
        .bind(session.patient_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get session owner: {:?}", e);
            AppError::Database(e)
        })?;

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, session_id, role, content, created_at
            FROM messages
            WHERE session_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list session messages: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(Some(SessionDetail {
            session,
            patient,
            messages,
        }))
    }

    async fn find_prior_sessions(
        &self,
        patient_id: Uuid,
        exclude_session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Session>> {
        sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {} FROM sessions
            WHERE patient_id = $1 AND id <> $2
              AND triage_summary IS NOT NULL AND btrim(triage_summary) <> ''
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            SESSION_COLUMNS
        ))
        .bind(patient_id)
        .bind(exclude_session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list prior sessions: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn append_exchange(
        &self,
        session_id: Uuid,
        patient: NewMessage,
        reply: NewMessage,
    ) -> Result<(Message, Message)> {
        let mut tx = self.pool.begin().await?;

        Self::lock_open_session(&mut tx, session_id).await?;
        let mut stored = Self::append_in_order(&mut tx, session_id, vec![patient, reply]).await?;

        tx.commit().await?;

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
        sqlx::query_as::<_, Session>(&format!(
            r#"
            UPDATE sessions SET doctor_diagnosis = $2, updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(diagnosis)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record diagnosis: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn issue_ticket(&self, issue: TicketIssue) -> Result<Ticket> {
        let mut tx = self.pool.begin().await?;

        Self::lock_doctor_day(&mut tx, issue.doctor_id, issue.window).await?;

        if let Some(summary) = issue.triage_summary.as_deref() {
            Self::lock_open_session(&mut tx, issue.session_id).await?;
            Self::set_triage_summary(&mut tx, issue.session_id, summary, issue.issued_at).await?;
        }

        let current_max = Self::find_max_ticket_number(&mut tx, issue.doctor_id, issue.window).await?;

        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (id, doctor_id, session_id, number, day_start, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(issue.doctor_id)
        .bind(issue.session_id)
        .bind(next_ticket_number(current_max))
        .bind(issue.window.start)
        .bind(issue.issued_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, "Ticket already issued", "Session or doctor not found")
        })?;

        if !issue.messages.is_empty() {
            Self::append_in_order(&mut tx, issue.session_id, issue.messages).await?;
        }

        tx.commit().await?;

        Ok(ticket)
    }

    async fn current_front(&self, doctor_id: Uuid, window: DayWindow) -> Result<Option<Ticket>> {
        sqlx::query_as::<_, Ticket>(
            r#"
            SELECT t.id, t.doctor_id, t.session_id, t.number, t.day_start, t.created_at
            FROM tickets t
            JOIN sessions s ON s.id = t.session_id
            WHERE t.doctor_id = $1
              AND t.day_start >= $2 AND t.day_start < $3
              AND (s.doctor_diagnosis IS NULL OR btrim(s.doctor_diagnosis) = '')
            ORDER BY t.number ASC
            LIMIT 1
            "#,
        )
        .bind(doctor_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get front of queue: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn count_tickets(&self, doctor_id: Uuid, window: Option<DayWindow>) -> Result<i64> {
        let query = match window {
            Some(window) => sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM tickets WHERE doctor_id = $1 AND day_start >= $2 AND day_start < $3",
            )
            .bind(doctor_id)
            .bind(window.start)
            .bind(window.end),
            None => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets WHERE doctor_id = $1")
                .bind(doctor_id),
        };

        query.fetch_one(&self.pool).await.map_err(|e| {
            tracing::error!("Failed to count tickets: {:?}", e);
            AppError::Database(e)
        })
    }
}
