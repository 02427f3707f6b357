mod patient_dto;

pub use patient_dto::{PatientResponseDto, RegisterPatientDto, VerifyOtpDto};
