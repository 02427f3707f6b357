mod doctor;

pub use doctor::Doctor;
