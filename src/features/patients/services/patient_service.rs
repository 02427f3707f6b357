use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate};
use rand::Rng;
use serde::Serialize;

use crate::core::error::{AppError, Result};
use crate::features::patients::models::{Patient, PatientRegistration};
use crate::features::sessions::models::{Session, Vitals};
use crate::modules::mailer::{Notifier, OutboundEmail};
use crate::modules::store::TriageStore;
use crate::shared::clock::Clock;
use crate::shared::constants::OTP_LENGTH;
use crate::shared::templates::render_otp_email;

/// Demographics submitted at registration
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub email: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
}

#[derive(Serialize)]
struct OtpEmailContext<'a> {
    patient_name: &'a str,
    otp_code: &'a str,
}

/// A fresh numeric code of `OTP_LENGTH` digits, zero padded
pub fn generate_otp() -> String {
    let upper = 10u32.pow(OTP_LENGTH as u32);
    let code = rand::thread_rng().gen_range(0..upper);
    format!("{:0width$}", code, width = OTP_LENGTH)
}

/// Registration and one-time-code verification
pub struct PatientService {
    store: Arc<dyn TriageStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    notify_timeout: Duration,
}

impl PatientService {
    pub fn new(
        store: Arc<dyn TriageStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            offset,
            notify_timeout,
        }
    }

    /// Create the patient or refresh an existing one, issuing a new code.
    ///
    /// Any earlier code for the same email stops working.
    pub async fn register(&self, input: NewPatient) -> Result<Patient> {
        let now = self.clock.now();
        let today = now.with_timezone(&self.offset).date_naive();
        if input.date_of_birth > today {
            return Err(AppError::Validation(
                "date_of_birth cannot be in the future".to_string(),
            ));
        }

        let otp = generate_otp();
        let patient = self
            .store
            .upsert_patient(
                PatientRegistration {
                    name: input.name.trim().to_string(),
                    email: input.email.trim().to_lowercase(),
                    nationality: input.nationality.trim().to_string(),
                    date_of_birth: input.date_of_birth,
                    gender: input.gender.trim().to_lowercase(),
                    otp: otp.clone(),
                },
                now,
            )
            .await?;

        tracing::info!("Patient registered: id={}", patient.id);

        self.send_otp(&patient, &otp).await;

        Ok(patient)
    }

    /// Consume the code and open a new triage session with the intake vitals
    pub async fn verify_otp(&self, email: &str, otp: &str, vitals: Vitals) -> Result<Session> {
        let session = self
            .store
            .open_session_with_otp(
                &email.trim().to_lowercase(),
                otp.trim(),
                vitals,
                self.clock.now(),
            )
            .await?;

        tracing::info!(
            "Session opened: id={}, patient_id={}",
            session.id,
            session.patient_id
        );

        Ok(session)
    }

    async fn send_otp(&self, patient: &Patient, otp: &str) {
        let html = render_otp_email(&OtpEmailContext {
            patient_name: &patient.name,
            otp_code: otp,
        })
        .map_err(|e| tracing::warn!("Failed to render OTP email: {}", e))
        .ok();

        let email = OutboundEmail {
            to: patient.email.clone(),
            subject: "Your verification code".to_string(),
            body: format!("Your verification code is {}.", otp),
            html,
        };

        match tokio::time::timeout(self.notify_timeout, self.notifier.send(email)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("OTP email to patient {} failed: {}", patient.id, e),
            Err(_) => tracing::warn!("OTP email to patient {} timed out", patient.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::MemoryTriageStore;
    use crate::shared::test_helpers::{
        clinic_offset, fake_registration, FixedClock, RecordingNotifier,
    };
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        store: Arc<MemoryTriageStore>,
        notifier: Arc<RecordingNotifier>,
        service: PatientService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryTriageStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = PatientService::new(
            store.clone(),
            notifier.clone(),
            Arc::new(FixedClock::morning()),
            clinic_offset(),
            Duration::from_millis(200),
        );
        Fixture {
            store,
            notifier,
            service,
        }
    }

    fn new_patient() -> NewPatient {
        let fake = fake_registration("000000");
        NewPatient {
            name: fake.name,
            email: fake.email,
            nationality: fake.nationality,
            date_of_birth: fake.date_of_birth,
            gender: fake.gender,
        }
    }

    fn vitals() -> Vitals {
        Vitals {
            weight: 70.0,
            height: 172.0,
            heart_rate: 88.0,
            body_temperature: 38.1,
        }
    }

    #[test]
    fn test_generated_otp_is_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_register_stores_code_and_emails_it() {
        let f = fixture();
        let patient = f.service.register(new_patient()).await.unwrap();

        let otp = patient.otp.clone().unwrap();
        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, patient.email);
        assert!(sent[0].body.contains(&otp));
    }

    #[tokio::test]
    async fn test_reregistration_replaces_code() {
        let f = fixture();
        let input = new_patient();
        let first = f.service.register(input.clone()).await.unwrap();
        let second = f.service.register(input).await.unwrap();

        assert_eq!(first.id, second.id);
        let stored = f.store.patient_by_email(&second.email).unwrap();
        assert_eq!(stored.otp, second.otp);
    }

    #[tokio::test]
    async fn test_otp_is_single_use() {
        let f = fixture();
        let patient = f.service.register(new_patient()).await.unwrap();
        let otp = patient.otp.clone().unwrap();

        let session = assert_ok!(f.service.verify_otp(&patient.email, &otp, vitals()).await);
        assert_eq!(session.patient_id, patient.id);
        assert!(session.triage_summary.is_none());
        assert_eq!(session.body_temperature, 38.1);

        let reused = f.service.verify_otp(&patient.email, &otp, vitals()).await;
        assert!(matches!(reused, Err(AppError::Unauthorized(_))));
        assert!(f.store.patient_by_email(&patient.email).unwrap().otp.is_none());
    }

    #[tokio::test]
    async fn test_wrong_code_and_unknown_email() {
        let f = fixture();
        let patient = f.service.register(new_patient()).await.unwrap();
        let wrong = if patient.otp.as_deref() == Some("111111") {
            "222222"
        } else {
            "111111"
        };

        let mismatch = f.service.verify_otp(&patient.email, wrong, vitals()).await;
        assert!(matches!(mismatch, Err(AppError::Unauthorized(_))));

        let unknown = f
            .service
            .verify_otp("nobody@mail.test", "123456", vitals())
            .await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_email_failure_does_not_fail_registration() {
        let f = fixture();
        f.notifier.fail(true);

        let patient = assert_ok!(f.service.register(new_patient()).await);
        assert!(patient.otp.is_some());
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_future_birth_date_is_rejected() {
        let f = fixture();
        let mut input = new_patient();
        input.date_of_birth = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();

        let err = assert_err!(f.service.register(input).await);
        assert!(matches!(err, AppError::Validation(_)));
    }
}
