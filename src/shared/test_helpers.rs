//! Deterministic collaborators and fixtures for unit and route tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use fake::faker::address::en::CountryName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;

use crate::features::patients::models::PatientRegistration;
use crate::modules::decision::{DecisionError, DecisionRequest, TriageDecider, TriageDecision};
use crate::modules::mailer::{Notifier, NotifyError, OutboundEmail};
use crate::shared::clock::Clock;

/// UTC+7, the clinic's zone in tests
pub fn clinic_offset() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

/// Clock that only moves when told to
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 2025-03-10 09:00 in the clinic's zone
    pub fn morning() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0).unwrap())
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Decider that replays queued outcomes and records every request
#[derive(Default)]
pub struct ScriptedDecider {
    outcomes: Mutex<VecDeque<Result<TriageDecision, DecisionError>>>,
    requests: Mutex<Vec<DecisionRequest>>,
    delay: Mutex<Option<StdDuration>>,
}

impl ScriptedDecider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Result<TriageDecision, DecisionError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn continue_chat(&self, reply: &str) {
        self.push(Ok(TriageDecision::ContinueChat {
            reply: reply.to_string(),
        }));
    }

    pub fn appointment(&self, reply: &str, doctor_id: impl ToString, prediagnosis: &str) {
        self.push(Ok(TriageDecision::Appointment {
            reply: reply.to_string(),
            doctor_id: doctor_id.to_string(),
            prediagnosis: prediagnosis.to_string(),
        }));
    }

    /// Sleep this long before answering
    pub fn delay(&self, by: StdDuration) {
        *self.delay.lock().unwrap() = Some(by);
    }

    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TriageDecider for ScriptedDecider {
    async fn decide(&self, request: DecisionRequest) -> Result<TriageDecision, DecisionError> {
        self.requests.lock().unwrap().push(request);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.outcomes.lock().unwrap().pop_front();
        outcome.unwrap_or_else(|| Err(DecisionError::EmptyResponse))
    }
}

/// Notifier that keeps sent emails in memory and can be told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Status(503));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Random demographics with the given code
pub fn fake_registration(otp: &str) -> PatientRegistration {
    PatientRegistration {
        name: Name().fake(),
        email: SafeEmail().fake(),
        nationality: CountryName().fake(),
        date_of_birth: NaiveDate::from_ymd_opt(
            (1950..2005).fake::<i32>(),
            (1..=12).fake::<u32>(),
            (1..=28).fake::<u32>(),
        )
        .unwrap(),
        gender: "female".to_string(),
        otp: otp.to_string(),
    }
}
