mod patient_service;

pub use patient_service::{NewPatient, PatientService};
