mod doctor_dto;

pub use doctor_dto::{DoctorDetailsDto, DoctorResponseDto};
