use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use serde::Serialize;
use uuid::Uuid;

use super::{SessionService, TriageContext};
use crate::core::config::{DecisionConfig, MailerConfig, TriageConfig};
use crate::core::error::{AppError, Result};
use crate::features::doctors::models::Doctor;
use crate::features::patients::models::Patient;
use crate::features::queue::models::Ticket;
use crate::features::queue::services::TicketSequencer;
use crate::features::sessions::models::{MessageRole, NewMessage};
use crate::modules::decision::{
    ChatTurn, DecisionRequest, NextAction, TriageDecider, TriageDecision,
};
use crate::modules::mailer::{Notifier, OutboundEmail};
use crate::modules::store::TriageStore;
use crate::shared::clock::Clock;
use crate::shared::constants::REPLY_TIMESTAMP_STEP_MS;
use crate::shared::templates::render_queue_ticket_email;

/// Tunables of one orchestration round
#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub system_prompt: String,
    pub history_limit: i64,
    pub queue_offset: FixedOffset,
    pub decision_timeout: Duration,
    pub notify_timeout: Duration,
}

impl TriageSettings {
    pub fn from_config(
        triage: &TriageConfig,
        decision: &DecisionConfig,
        mailer: &MailerConfig,
    ) -> Self {
        Self {
            system_prompt: triage.system_prompt.clone(),
            history_limit: triage.history_limit,
            queue_offset: triage.queue_offset,
            decision_timeout: decision.timeout,
            notify_timeout: mailer.timeout,
        }
    }
}

/// Result of one patient message
#[derive(Debug, Clone)]
pub struct TriageOutcome {
    pub session_id: Uuid,
    pub reply: String,
    pub next_action: NextAction,
    /// Set for `Appointment`
    pub ticket: Option<Ticket>,
    pub current_front: Option<Ticket>,
    pub doctor: Option<Doctor>,
}

#[derive(Serialize)]
struct QueueEmailContext<'a> {
    patient_name: &'a str,
    ticket_number: i32,
    current_number: Option<i32>,
    doctor_name: &'a str,
    doctor_specialty: &'a str,
    room: &'a str,
}

/// Drives one conversational round: context, decision, queueing, history
pub struct TriageService {
    store: Arc<dyn TriageStore>,
    sessions: Arc<SessionService>,
    sequencer: Arc<TicketSequencer>,
    decider: Arc<dyn TriageDecider>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: TriageSettings,
}

impl TriageService {
    pub fn new(
        store: Arc<dyn TriageStore>,
        sessions: Arc<SessionService>,
        sequencer: Arc<TicketSequencer>,
        decider: Arc<dyn TriageDecider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: TriageSettings,
    ) -> Self {
        Self {
            store,
            sessions,
            sequencer,
            decider,
            notifier,
            clock,
            settings,
        }
    }

    /// Process one patient message.
    ///
    /// Nothing is written unless the decision is valid. On `Appointment` the
    /// summary, the ticket and the exchange are committed as one unit; on
    /// `ContinueChat` only the exchange is appended. Both writes re-check
    /// that the session is still open, so a message racing a concluded
    /// triage fails with `Conflict`.
    pub async fn handle_message(&self, session_id: Uuid, message: &str) -> Result<TriageOutcome> {
        let message = message.trim().to_string();
        if message.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }

        let detail = self.sessions.get_active(session_id).await?;

        let doctors = self.store.list_doctors().await?;
        let prior_sessions = self
            .store
            .find_prior_sessions(detail.patient.id, session_id, self.settings.history_limit)
            .await?;

        let system_context = TriageContext::build(
            &self.settings.system_prompt,
            &detail,
            &doctors,
            &prior_sessions,
            self.clock.now(),
            self.settings.queue_offset,
        )
        .render()?;

        let decision = self
            .decide(DecisionRequest {
                system_context,
                history: detail
                    .messages
                    .iter()
                    .map(|m| ChatTurn {
                        role: m.role,
                        content: m.content.clone(),
                    })
                    .collect(),
                new_message: message.clone(),
            })
            .await?;

        tracing::info!(
            "Triage decision: session_id={}, next_action={}",
            session_id,
            decision.next_action().as_str()
        );

        let exchange = self.exchange(message, decision.reply().to_string());

        match decision {
            TriageDecision::ContinueChat { reply } => {
                let [patient, assistant] = exchange;
                self.store
                    .append_exchange(session_id, patient, assistant)
                    .await?;

                Ok(TriageOutcome {
                    session_id,
                    reply,
                    next_action: NextAction::ContinueChat,
                    ticket: None,
                    current_front: None,
                    doctor: None,
                })
            }
            TriageDecision::Appointment {
                reply,
                doctor_id,
                prediagnosis,
            } => {
                let doctor = self.resolve_doctor(&doctor_id).await?;

                let ticket = self
                    .sequencer
                    .queue_session(session_id, doctor.id, &prediagnosis, exchange.into())
                    .await?;
                let current_front = self
                    .sequencer
                    .current_front(doctor.id, self.sequencer.today())
                    .await?;

                self.notify_queued(&detail.patient, &doctor, &ticket, current_front.as_ref())
                    .await;

                Ok(TriageOutcome {
                    session_id,
                    reply,
                    next_action: NextAction::Appointment,
                    ticket: Some(ticket),
                    current_front,
                    doctor: Some(doctor),
                })
            }
        }
    }

    async fn decide(&self, request: DecisionRequest) -> Result<TriageDecision> {
        let timeout = self.settings.decision_timeout;
        match tokio::time::timeout(timeout, self.decider.decide(request)).await {
            Ok(Ok(decision)) => Ok(decision),
            Ok(Err(e)) => Err(AppError::Decision(e.to_string())),
            Err(_) => Err(AppError::Decision(format!(
                "no decision within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// The decision's doctor id must name a doctor in the directory
    async fn resolve_doctor(&self, doctor_id: &str) -> Result<Doctor> {
        let id = Uuid::parse_str(doctor_id.trim())
            .map_err(|_| AppError::InvalidDoctor(doctor_id.to_string()))?;

        self.store
            .find_doctor(id)
            .await?
            .ok_or_else(|| AppError::InvalidDoctor(doctor_id.to_string()))
    }

    /// Patient message then reply. The store moves both past the newest
    /// message it holds when it appends them.
    fn exchange(&self, message: String, reply: String) -> [NewMessage; 2] {
        let step = chrono::Duration::milliseconds(REPLY_TIMESTAMP_STEP_MS);
        let patient_at = self.clock.now();

        [
            NewMessage {
                role: MessageRole::Patient,
                content: message,
                created_at: patient_at,
            },
            NewMessage {
                role: MessageRole::Assistant,
                content: reply,
                created_at: patient_at + step,
            },
        ]
    }

    /// Best-effort: failures and timeouts are logged only
    async fn notify_queued(
        &self,
        patient: &Patient,
        doctor: &Doctor,
        ticket: &Ticket,
        current_front: Option<&Ticket>,
    ) {
        let context = QueueEmailContext {
            patient_name: &patient.name,
            ticket_number: ticket.number,
            current_number: current_front.map(|t| t.number),
            doctor_name: &doctor.name,
            doctor_specialty: &doctor.specialty,
            room: &doctor.room,
        };

        let html = match render_queue_ticket_email(&context) {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!("Failed to render queue email: {}", e);
                None
            }
        };

        let body = match current_front {
            Some(front) => format!(
                "Your queue number is {}. The current queue number is {}.",
                ticket.number, front.number
            ),
            None => format!("Your queue number is {}.", ticket.number),
        };

        let email = OutboundEmail {
            to: patient.email.clone(),
            subject: "Queue Notification".to_string(),
            body,
            html,
        };

        let timeout = self.settings.notify_timeout;
        match tokio::time::timeout(timeout, self.notifier.send(email)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                "Queue notification for session {} failed: {}",
                ticket.session_id,
                e
            ),
            Err(_) => tracing::warn!(
                "Queue notification for session {} timed out",
                ticket.session_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::sessions::models::{Session, SessionState};
    use crate::modules::decision::DecisionError;
    use crate::modules::store::MemoryTriageStore;
    use crate::shared::test_helpers::{
        clinic_offset, FixedClock, RecordingNotifier, ScriptedDecider,
    };
    use chrono::NaiveDate;

    struct Harness {
        store: Arc<MemoryTriageStore>,
        clock: Arc<FixedClock>,
        decider: Arc<ScriptedDecider>,
        notifier: Arc<RecordingNotifier>,
        sequencer: Arc<TicketSequencer>,
        triage: Arc<TriageService>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryTriageStore::new());
        let clock = Arc::new(FixedClock::morning());
        let decider = Arc::new(ScriptedDecider::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let sessions = Arc::new(SessionService::new(store.clone(), clock.clone()));
        let sequencer = Arc::new(TicketSequencer::new(
            store.clone(),
            clock.clone(),
            clinic_offset(),
        ));
        let triage = Arc::new(TriageService::new(
            store.clone(),
            sessions,
            sequencer.clone(),
            decider.clone(),
            notifier.clone(),
            clock.clone(),
            TriageSettings {
                system_prompt: "You are Triana.".to_string(),
                history_limit: 5,
                queue_offset: clinic_offset(),
                decision_timeout: Duration::from_millis(200),
                notify_timeout: Duration::from_millis(200),
            },
        ));

        Harness {
            store,
            clock,
            decider,
            notifier,
            sequencer,
            triage,
        }
    }

    fn open_session(h: &Harness) -> Session {
        let patient = h.store.seed_patient(
            "Wayan",
            &format!("{}@mail.test", Uuid::now_v7()),
            NaiveDate::from_ymd_opt(1985, 6, 15).unwrap(),
        );
        h.store.seed_session(patient.id, h.clock.now())
    }

    async fn state_of(h: &Harness, session_id: Uuid) -> SessionState {
        h.store.find_session(session_id).await.unwrap().unwrap().state()
    }

    #[tokio::test]
    async fn test_continue_chat_appends_exchange_without_ticket() {
        let h = harness();
        let session = open_session(&h);
        h.decider.continue_chat("How long have you had the fever?");

        let outcome = h
            .triage
            .handle_message(session.id, "I have a fever")
            .await
            .unwrap();

        assert_eq!(outcome.next_action, NextAction::ContinueChat);
        assert_eq!(outcome.reply, "How long have you had the fever?");
        assert!(outcome.ticket.is_none());
        assert!(h.store.tickets().is_empty());

        let messages = h.store.messages(session.id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::Patient);
        assert_eq!(messages[0].content, "I have a fever");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(state_of(&h, session.id).await, SessionState::Active);
    }

    #[tokio::test]
    async fn test_appointment_queues_session_and_reports_front() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.decider.appointment(
            "Please see Dr. Sari in room A1.",
            doctor.id,
            "influenza-like illness",
        );

        let outcome = h
            .triage
            .handle_message(session.id, "fever and cough for 3 days")
            .await
            .unwrap();

        let ticket = outcome.ticket.expect("ticket issued");
        assert_eq!(outcome.next_action, NextAction::Appointment);
        assert_eq!(ticket.number, 1);
        assert_eq!(outcome.current_front, Some(ticket.clone()));
        assert_eq!(outcome.doctor.map(|d| d.id), Some(doctor.id));

        let stored = h.store.session(session.id).unwrap();
        assert_eq!(stored.triage_summary.as_deref(), Some("influenza-like illness"));
        assert_eq!(h.store.tickets().len(), 1);
        assert_eq!(h.store.messages(session.id).len(), 2);
        assert_eq!(state_of(&h, session.id).await, SessionState::Queued);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("Your queue number is 1"));
        assert!(sent[0].html.as_deref().is_some_and(|html| html.contains("Dr. Sari")));
    }

    #[tokio::test]
    async fn test_front_stays_on_earlier_ticket() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let first = open_session(&h);
        let second = open_session(&h);

        h.decider.appointment("See Dr. Sari", doctor.id, "otitis");
        h.triage.handle_message(first.id, "ear pain").await.unwrap();
        h.decider.appointment("See Dr. Sari", doctor.id, "conjunctivitis");
        let outcome = h.triage.handle_message(second.id, "red eye").await.unwrap();

        assert_eq!(outcome.ticket.map(|t| t.number), Some(2));
        assert_eq!(outcome.current_front.map(|t| t.number), Some(1));

        let front = h
            .sequencer
            .current_front(doctor.id, h.sequencer.today())
            .await
            .unwrap();
        assert_eq!(front.map(|t| t.session_id), Some(first.id));
    }

    #[tokio::test]
    async fn test_unknown_doctor_writes_nothing() {
        let h = harness();
        h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.decider.appointment("See the doctor", Uuid::now_v7(), "gastritis");

        let result = h.triage.handle_message(session.id, "stomach ache").await;

        assert!(matches!(result, Err(AppError::InvalidDoctor(_))));
        assert!(h.store.tickets().is_empty());
        assert!(h.store.messages(session.id).is_empty());
        assert!(h.store.session(session.id).unwrap().triage_summary.is_none());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_non_uuid_doctor_is_invalid_doctor() {
        let h = harness();
        let session = open_session(&h);
        h.decider.appointment("See the doctor", "dr-sari", "gastritis");

        let result = h.triage.handle_message(session.id, "stomach ache").await;
        assert!(matches!(result, Err(AppError::InvalidDoctor(_))));
    }

    #[tokio::test]
    async fn test_queued_session_is_rejected_before_deciding() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.decider.appointment("See Dr. Sari", doctor.id, "sinusitis");
        h.triage.handle_message(session.id, "blocked nose").await.unwrap();

        h.decider.appointment("See Dr. Sari again", doctor.id, "sinusitis");
        let again = h.triage.handle_message(session.id, "still blocked").await;

        assert!(matches!(again, Err(AppError::SessionCompleted(_))));
        assert_eq!(h.decider.requests().len(), 1);
        assert_eq!(h.store.tickets().len(), 1);
        assert_eq!(h.store.messages(session.id).len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appointments_issue_one_ticket() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.decider.appointment("See Dr. Sari", doctor.id, "migraine");
        h.decider.appointment("See Dr. Sari", doctor.id, "migraine");

        let (a, b) = tokio::join!(
            h.triage.handle_message(session.id, "headache"),
            h.triage.handle_message(session.id, "headache")
        );

        let outcomes = [a, b];
        let ok = outcomes.iter().filter(|r| r.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(AppError::Conflict(_)) | Err(AppError::SessionCompleted(_))
                )
            })
            .count();

        assert_eq!(ok, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(h.store.tickets().len(), 1);
        assert_eq!(h.store.messages(session.id).len(), 2);
    }

    fn assert_pairs_adjacent(messages: &[crate::features::sessions::models::Message]) {
        assert_eq!(messages.len() % 2, 0);
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::Patient);
            assert_eq!(pair[1].role, MessageRole::Assistant);
        }
        assert!(messages.windows(2).all(|w| w[0].created_at < w[1].created_at));
    }

    #[tokio::test]
    async fn test_concurrent_messages_keep_each_reply_after_its_message() {
        let h = harness();
        let session = open_session(&h);
        h.decider.delay(Duration::from_millis(10));
        h.decider.continue_chat("Any fever?");
        h.decider.continue_chat("Any cough?");

        let (a, b) = tokio::join!(
            h.triage.handle_message(session.id, "my throat hurts"),
            h.triage.handle_message(session.id, "since yesterday")
        );
        a.unwrap();
        b.unwrap();

        let messages = h.store.messages(session.id);
        assert_eq!(messages.len(), 4);
        assert_pairs_adjacent(&messages);

        let mut sent: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::Patient)
            .map(|m| m.content.as_str())
            .collect();
        sent.sort_unstable();
        assert_eq!(sent, ["my throat hurts", "since yesterday"]);
    }

    #[tokio::test]
    async fn test_message_racing_appointment_never_follows_queueing() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.decider.delay(Duration::from_millis(10));
        h.decider.appointment("Please see Dr. Sari.", doctor.id, "angina");
        h.decider.continue_chat("Does it spread to your arm?");

        let (a, b) = tokio::join!(
            h.triage.handle_message(session.id, "chest pain"),
            h.triage.handle_message(session.id, "and short of breath")
        );

        for result in [&a, &b] {
            assert!(matches!(result, Ok(_) | Err(AppError::Conflict(_))));
        }

        let messages = h.store.messages(session.id);
        assert_pairs_adjacent(&messages);
        assert_eq!(
            messages.last().map(|m| m.content.as_str()),
            Some("Please see Dr. Sari.")
        );
        assert_eq!(h.store.tickets().len(), 1);
        assert_eq!(state_of(&h, session.id).await, SessionState::Queued);
    }

    #[tokio::test]
    async fn test_exchange_on_queued_session_conflicts() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.sequencer
            .queue_session(session.id, doctor.id, "tonsillitis", Vec::new())
            .await
            .unwrap();

        let [patient, reply] = h.triage.exchange("hello?".to_string(), "hi".to_string());
        let result = h.store.append_exchange(session.id, patient, reply).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(h.store.messages(session.id).is_empty());
    }

    #[tokio::test]
    async fn test_closed_prior_session_outlasts_newer_abandoned_ones() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let patient = h.store.seed_patient(
            "Wayan",
            "wayan@mail.test",
            NaiveDate::from_ymd_opt(1985, 6, 15).unwrap(),
        );

        let old = h
            .store
            .seed_session(patient.id, h.clock.now() - chrono::Duration::days(30));
        h.sequencer
            .queue_session(old.id, doctor.id, "recurrent asthma", Vec::new())
            .await
            .unwrap();
        for hours in 1..=5 {
            h.store
                .seed_session(patient.id, h.clock.now() - chrono::Duration::hours(hours));
        }
        let current = h.store.seed_session(patient.id, h.clock.now());

        h.decider.continue_chat("Are you wheezing?");
        h.triage
            .handle_message(current.id, "hard to breathe")
            .await
            .unwrap();

        let requests = h.decider.requests();
        assert!(requests[0].system_context.contains("recurrent asthma"));
    }

    #[tokio::test]
    async fn test_decision_failure_and_timeout_write_nothing() {
        let h = harness();
        let session = open_session(&h);

        h.decider
            .push(Err(DecisionError::Malformed("not json".to_string())));
        let failed = h.triage.handle_message(session.id, "hello").await;
        assert!(matches!(failed, Err(AppError::Decision(_))));

        h.decider.delay(Duration::from_secs(5));
        h.decider.continue_chat("too late");
        let timed_out = h.triage.handle_message(session.id, "hello").await;
        assert!(matches!(timed_out, Err(AppError::Decision(_))));

        assert!(h.store.messages(session.id).is_empty());
        assert_eq!(state_of(&h, session.id).await, SessionState::IntakePending);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_queueing() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.notifier.fail(true);
        h.decider.appointment("See Dr. Sari", doctor.id, "back strain");

        let outcome = h
            .triage
            .handle_message(session.id, "back pain")
            .await
            .unwrap();

        assert_eq!(outcome.ticket.map(|t| t.number), Some(1));
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_messages_keep_insertion_order_with_frozen_clock() {
        let h = harness();
        let session = open_session(&h);
        for reply in ["one", "two", "three"] {
            h.decider.continue_chat(reply);
        }

        for text in ["a", "b", "c"] {
            h.triage.handle_message(session.id, text).await.unwrap();
        }

        let messages = h.store.messages(session.id);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "one", "b", "two", "c", "three"]);
        assert!(messages.windows(2).all(|w| w[0].created_at < w[1].created_at));
    }

    #[tokio::test]
    async fn test_history_and_context_reach_the_decider() {
        let h = harness();
        let doctor = h.store.seed_doctor("Dr. Sari", "General", "A1");
        let session = open_session(&h);
        h.decider.continue_chat("Where does it hurt?");
        h.decider.continue_chat("Since when?");

        h.triage.handle_message(session.id, "I feel pain").await.unwrap();
        h.triage.handle_message(session.id, "My knee").await.unwrap();

        let requests = h.decider.requests();
        let last = requests.last().unwrap();
        assert_eq!(last.new_message, "My knee");
        assert_eq!(last.history.len(), 2);
        assert_eq!(last.history[0].role, MessageRole::Patient);
        assert_eq!(last.history[1].content, "Where does it hurt?");
        assert!(last.system_context.contains(&doctor.id.to_string()));
        assert!(last.system_context.contains("Name: Wayan"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let h = harness();
        let result = h.triage.handle_message(Uuid::now_v7(), "hi").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(h.decider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected_without_deciding() {
        let h = harness();
        let session = open_session(&h);

        let result = h.triage.handle_message(session.id, "   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(h.decider.requests().is_empty());
        assert!(h.store.messages(session.id).is_empty());
    }
}
