//! Triage sessions: conversation, decision, queueing and diagnosis.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/sessions/{id}` | Active session with history |
//! | POST | `/api/sessions/{id}` | Send a patient message |
//! | POST | `/api/sessions/{id}/diagnose` | Record the doctor's diagnosis |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{SessionService, TriageService, TriageSettings};
