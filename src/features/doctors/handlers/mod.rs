mod doctor_handler;

pub use doctor_handler::*;
