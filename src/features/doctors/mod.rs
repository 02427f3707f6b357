//! Doctor directory with per-doctor appointment figures.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/doctors` | List doctors |
//! | GET | `/api/doctors/{id}` | Doctor details and queue front |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::DoctorService;
