use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::patients::models::Patient;
use crate::features::patients::services::NewPatient;
use crate::features::sessions::models::Vitals;

/// Request DTO for patient registration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPatientDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Nationality must be 1-100 characters"))]
    pub nationality: String,

    /// ISO date, e.g. `1990-05-17`
    pub date_of_birth: NaiveDate,

    #[validate(regex(
        path = *crate::shared::validation::GENDER_REGEX,
        message = "Gender must be male, female or other"
    ))]
    pub gender: String,
}

impl From<RegisterPatientDto> for NewPatient {
    fn from(dto: RegisterPatientDto) -> Self {
        Self {
            name: dto.name,
            email: dto.email,
            nationality: dto.nationality,
            date_of_birth: dto.date_of_birth,
            gender: dto.gender,
        }
    }
}

/// Request DTO for code verification; opens a session with these vitals
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(regex(
        path = *crate::shared::validation::OTP_REGEX,
        message = "OTP must be exactly 6 digits"
    ))]
    pub otp: String,

    /// Kilograms
    #[validate(range(min = 0.5, max = 500.0, message = "Weight must be 0.5-500 kg"))]
    pub weight: f64,

    /// Centimetres
    #[validate(range(min = 20.0, max = 300.0, message = "Height must be 20-300 cm"))]
    pub height: f64,

    /// Beats per minute
    #[validate(range(min = 20.0, max = 300.0, message = "Heart rate must be 20-300 bpm"))]
    pub heart_rate: f64,

    /// Degrees Celsius
    #[validate(range(min = 25.0, max = 45.0, message = "Body temperature must be 25-45 °C"))]
    pub body_temperature: f64,
}

impl VerifyOtpDto {
    pub fn vitals(&self) -> Vitals {
        Vitals {
            weight: self.weight,
            height: self.height,
            heart_rate: self.heart_rate,
            body_temperature: self.body_temperature,
        }
    }
}

/// Response DTO for patient. The code is never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientResponseDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Patient> for PatientResponseDto {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
            nationality: p.nationality,
            date_of_birth: p.date_of_birth,
            gender: p.gender,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verify_dto() -> VerifyOtpDto {
        VerifyOtpDto {
            email: "ayu@mail.test".to_string(),
            otp: "042137".to_string(),
            weight: 60.0,
            height: 160.0,
            heart_rate: 75.0,
            body_temperature: 36.6,
        }
    }

    #[test]
    fn test_verify_dto_accepts_plausible_vitals() {
        assert!(verify_dto().validate().is_ok());
    }

    #[test]
    fn test_verify_dto_rejects_bad_code_and_vitals() {
        let mut dto = verify_dto();
        dto.otp = "42137".to_string();
        assert!(dto.validate().is_err());

        let mut dto = verify_dto();
        dto.body_temperature = 52.0;
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("body_temperature"));
    }

    #[test]
    fn test_register_dto_rejects_unknown_gender() {
        let dto = RegisterPatientDto {
            name: "Ayu".to_string(),
            email: "ayu@mail.test".to_string(),
            nationality: "Indonesia".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            gender: "unknown".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}
