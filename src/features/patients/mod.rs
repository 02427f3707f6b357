//! Patient registration and one-time code verification.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/patients/register` | Register and receive a code by email |
//! | POST | `/api/patients/verify-otp` | Exchange the code for a new session |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::PatientService;
