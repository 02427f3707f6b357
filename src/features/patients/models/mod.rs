mod patient;

pub use patient::{Age, Patient, PatientRegistration};
