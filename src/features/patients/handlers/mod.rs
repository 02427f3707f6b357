mod patient_handler;

pub use patient_handler::*;
