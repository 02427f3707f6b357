mod doctor_service;

pub use doctor_service::{DoctorDetails, DoctorService};
